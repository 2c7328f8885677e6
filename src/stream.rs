//! 并发流控制模块
//! Stream control module
//!
//! 本模块提供了用于多线程环境下的同步原语。
//! 主要用于在多个工作线程之间分配待计算的偏移 (OffsetSource) 和控制停止信号 (StopFlag)。

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// 偏移分配源。
/// 线程安全的计数器，把一个偏移区间中的每个偏移恰好分配给一个工作线程。
#[derive(Debug)]
pub struct OffsetSource {
    next: AtomicU64,
    end: u64,
}

impl OffsetSource {
    /// 创建覆盖 `range` 的分配源。
    pub fn new(range: Range<u64>) -> Self {
        Self {
            next: AtomicU64::new(range.start),
            end: range.end,
        }
    }

    /// 取出下一个待计算的偏移；区间耗尽后返回 `None`。
    ///
    /// 只需要取得唯一的值，不依赖与其他内存操作的先后关系，因此使用 `Relaxed`。
    /// 使用 `fetch_update` 而不是 `fetch_add`，避免区间末尾为 `u64::MAX` 时计数器溢出。
    #[inline]
    pub fn fetch(&self) -> Option<u64> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                (current < self.end).then(|| current + 1)
            })
            .ok()
    }
}

/// 停止标志。
/// 用于协调多个线程何时应该停止工作，例如某个偏移计算失败时。
#[derive(Debug)]
pub struct StopFlag {
    stop: AtomicBool,
}

impl StopFlag {
    /// 创建一个新的 StopFlag，初始状态为 false (不停止)。
    pub const fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
        }
    }

    /// 检查是否应该停止工作。
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// 强制设置停止标志为 true。
    /// 低频操作（只在结束或出错时调用），使用 SeqCst。
    pub fn force_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}
