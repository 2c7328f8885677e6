//! 测试替身
//! Test doubles for `PackingHasher`.
//!
//! `FoldHasher` 是一个简化的确定性函数，让测试可以机械地检查哈希链，
//! 而不必依赖真实的密码学摘要。

use crate::digest::{
    ContextInitError, PackingContext, PackingHasher, Segment, Sha256Context, Sha256Hasher,
    PACKING_HASH_SIZE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 把输入按位置折叠进 32 字节状态的简化摘要。
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldHasher;

#[derive(Debug, Clone)]
pub struct FoldContext {
    state: Segment,
    len: usize,
}

impl FoldContext {
    const INITIAL: Segment = [0x5a; PACKING_HASH_SIZE];
}

impl PackingContext for FoldContext {
    fn update(&mut self, data: &[u8]) {
        for byte in data {
            let slot = self.len % PACKING_HASH_SIZE;
            self.state[slot] = self.state[slot]
                .rotate_left(3)
                .wrapping_mul(31)
                .wrapping_add(*byte)
                ^ (self.len as u8);
            self.len += 1;
        }
    }

    fn finalize_reset(&mut self) -> Segment {
        let mut out = self.state;
        // 让每个输出字节都依赖于全部状态
        let mut carry = (self.len as u8).wrapping_add(1);
        for _ in 0..2 {
            for byte in out.iter_mut() {
                carry = carry.wrapping_mul(167).wrapping_add(*byte);
                *byte = carry;
            }
        }
        self.state = Self::INITIAL;
        self.len = 0;
        out
    }
}

impl PackingHasher for FoldHasher {
    type Context = FoldContext;

    fn init(&self) -> Result<Self::Context, ContextInitError> {
        Ok(FoldContext {
            state: FoldContext::INITIAL,
            len: 0,
        })
    }
}

/// 模拟摘要上下文无法初始化。
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingHasher;

impl PackingHasher for FailingHasher {
    type Context = FoldContext;

    fn init(&self) -> Result<Self::Context, ContextInitError> {
        Err(ContextInitError)
    }
}

/// 统计摘要输出次数的 SHA-256 包装。
#[derive(Debug, Clone, Default)]
pub struct CountingHasher {
    pub digests: Arc<AtomicUsize>,
}

impl CountingHasher {
    pub fn count(&self) -> usize {
        self.digests.load(Ordering::SeqCst)
    }
}

pub struct CountingContext {
    inner: Sha256Context,
    digests: Arc<AtomicUsize>,
}

impl PackingContext for CountingContext {
    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize_reset(&mut self) -> Segment {
        self.digests.fetch_add(1, Ordering::SeqCst);
        self.inner.finalize_reset()
    }
}

impl PackingHasher for CountingHasher {
    type Context = CountingContext;

    fn init(&self) -> Result<Self::Context, ContextInitError> {
        Ok(CountingContext {
            inner: Sha256Hasher.init()?,
            digests: self.digests.clone(),
        })
    }
}
