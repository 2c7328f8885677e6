//! 核心引擎模块
//! Core engine module
//!
//! 单个熵块的计算在一次调用内部是严格顺序的，但不同偏移之间完全独立。
//! 本模块实现了 `EntropyEngine`：把一个偏移区间分配给多个工作线程并行计算，
//! 再按偏移顺序收集结果。

use crate::error::Error;
use crate::stream::{OffsetSource, StopFlag};
use crate::types::{EntropyChunk, PackingConfig, DEFAULT_PACKING_ITERATIONS};
use derive_builder::Builder; // 使用 Builder 模式宏，简化复杂结构体的构建
use flume::{Receiver, Sender};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

/// 熵计算引擎特征 (Trait)。
pub trait PackingEngine {
    /// 计算单个偏移的熵块。
    fn compute_one(
        &self,
        address: &[u8],
        partition_hash: &[u8],
        offset: u64,
    ) -> Result<EntropyChunk, Error>;

    /// 计算区间 `offsets` 内每个偏移的熵块，结果按偏移升序排列。
    fn compute_range(
        &self,
        address: &[u8],
        partition_hash: &[u8],
        offsets: Range<u64>,
    ) -> Result<Vec<EntropyChunk>, Error>;
}

/// 多线程熵计算引擎。
///
/// 使用 `derive_builder` 自动生成 Builder，
/// 例如 `EntropyEngineBuilder::default().iterations(16_384).threads(8).build_validated()`。
#[derive(Builder, Debug)]
#[builder(pattern = "owned")]
pub struct EntropyEngine {
    /// 打包深度：每个熵块执行的链式哈希总次数。
    #[builder(default = "DEFAULT_PACKING_ITERATIONS")]
    pub iterations: u32,

    /// 并行计算使用的线程数。
    pub threads: usize,

    /// 进度计数器，记录当前区间已完成的熵块数量。
    #[builder(default)]
    pub progress: Arc<AtomicU64>,
}

type ChunkResult = Result<EntropyChunk, Error>;

/// 单偏移计算函数，在线程间共享。
type Computer = dyn Fn(u64) -> ChunkResult + Send + Sync;

impl EntropyEngine {
    pub fn config(&self) -> PackingConfig {
        PackingConfig {
            iterations: self.iterations,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        self.config().validate()?;
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be >= 1".into()));
        }
        Ok(())
    }
}

impl EntropyEngineBuilder {
    fn validate(&self) -> Result<(), Error> {
        if self.iterations == Some(0) {
            return Err(Error::InvalidConfig("iterations must be >= 1".into()));
        }
        if self.threads.unwrap_or(0) == 0 {
            return Err(Error::InvalidConfig("threads must be >= 1".into()));
        }
        Ok(())
    }

    /// 构建并验证引擎实例。
    pub fn build_validated(self) -> Result<EntropyEngine, Error> {
        self.validate()?;
        self.build().map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

impl PackingEngine for EntropyEngine {
    fn compute_one(
        &self,
        address: &[u8],
        partition_hash: &[u8],
        offset: u64,
    ) -> Result<EntropyChunk, Error> {
        self.validate()?;
        EntropyChunk::compute(address, offset, partition_hash, self.config())
    }

    fn compute_range(
        &self,
        address: &[u8],
        partition_hash: &[u8],
        offsets: Range<u64>,
    ) -> Result<Vec<EntropyChunk>, Error> {
        self.validate()?;
        self.progress.store(0, Ordering::SeqCst);

        let config = self.config();
        let address: Arc<[u8]> = Arc::from(address);
        let partition_hash: Arc<[u8]> = Arc::from(partition_hash);

        debug!(
            start = offsets.start,
            end = offsets.end,
            threads = self.threads,
            iterations = config.iterations,
            "computing entropy range"
        );

        let computer: Arc<Computer> = Arc::new(move |offset| {
            EntropyChunk::compute(&address, offset, &partition_hash, config)
        });
        let chunks = compute_range_with(offsets, self.threads, self.progress.clone(), computer)?;

        debug!(chunks = chunks.len(), "entropy range complete");
        Ok(chunks)
    }
}

/// 核心并行计算逻辑。
///
/// - 主线程：收集结果，更新进度，出错时通知所有线程停止。
/// - Worker 线程：从 `OffsetSource` 取偏移，计算熵块并发送回主线程。
fn compute_range_with(
    offsets: Range<u64>,
    threads: usize,
    progress: Arc<AtomicU64>,
    computer: Arc<Computer>,
) -> Result<Vec<EntropyChunk>, Error> {
    let needed = offsets.end.saturating_sub(offsets.start);
    if needed == 0 {
        return Ok(Vec::new());
    }
    let needed = usize::try_from(needed)
        .map_err(|_| Error::InvalidConfig("offset range is too large".into()))?;

    // 结果缓冲区在启动线程之前预留，容量不足时直接返回 Allocation
    let mut chunks = Vec::new();
    chunks.try_reserve_exact(needed).map_err(|_| Error::Allocation)?;

    let source = Arc::new(OffsetSource::new(offsets));
    let stop = Arc::new(StopFlag::new());

    // 有界通道：主线程来不及处理时，worker 在 send 上等待，而不是无限积压 256 KiB 的块
    let workers = threads.max(1).min(needed);
    let (tx, rx): (Sender<ChunkResult>, Receiver<ChunkResult>) = flume::bounded(workers * 2);

    let mut joins = Vec::with_capacity(workers);
    for _ in 0..workers {
        // 每个 worker 持有共享状态的一份引用计数
        let worker_source = source.clone();
        let worker_stop = stop.clone();
        let worker_tx = tx.clone();
        let worker_computer = computer.clone();

        joins.push(thread::spawn(move || {
            worker_loop(worker_source, worker_stop, worker_tx, worker_computer);
        }));
    }

    // 丢弃主线程持有的发送端，所有 worker 退出后接收端才能观察到通道关闭
    drop(tx);

    // recv 在所有 worker 退出（发送端全部释放）后返回 Err，循环结束
    while let Ok(result) = rx.recv() {
        match result {
            Ok(chunk) => {
                trace!(offset = chunk.offset, "entropy chunk computed");
                chunks.push(chunk);
                // 每收到一个块，进度 +1
                progress.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                warn!(error = %err, "entropy worker failed");
                // 通知其他 worker 不再领取新的偏移
                stop.force_stop();
                // 先关闭接收端，阻塞在 send 上的 worker 才能退出
                drop(rx);
                // panic 优先于计算错误报告
                join_handles(joins)?;
                return Err(err);
            }
        }
    }

    // 没有 panic 时，每个偏移都已被领取并发送，结果数量恰好为 needed
    join_handles(joins)?;

    // worker 完成顺序不确定，按偏移重新排序
    chunks.sort_by_key(|chunk| chunk.offset);
    Ok(chunks)
}

/// Worker 线程的主循环。
fn worker_loop(
    source: Arc<OffsetSource>,
    stop: Arc<StopFlag>,
    tx: Sender<ChunkResult>,
    computer: Arc<Computer>,
) {
    // 每轮开始前检查停止信号
    while !stop.should_stop() {
        // 区间耗尽，正常退出
        let Some(offset) = source.fetch() else {
            break;
        };

        let result = computer(offset);
        let failed = result.is_err();
        // 有界通道：主线程跟不上时在这里阻塞
        if tx.send(result).is_err() {
            // 接收端已关闭，主线程已经退出收集循环
            stop.force_stop();
            break;
        }
        if failed {
            // 错误已交给主线程，本线程不再继续
            stop.force_stop();
            break;
        }
    }
}

/// 等待所有线程结束，任何一个线程 panic 都视为失败。
fn join_handles(joins: Vec<thread::JoinHandle<()>>) -> Result<(), Error> {
    let mut panicked = 0usize;
    for handle in joins {
        if handle.join().is_err() {
            panicked += 1;
        }
    }
    if panicked > 0 {
        return Err(Error::WorkerFailed(format!(
            "{panicked} worker thread(s) panicked"
        )));
    }
    Ok(())
}
