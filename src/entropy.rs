//! 熵块计算模块
//! Entropy chunk module
//!
//! 熵块的计算分三个阶段，数据严格向前流动：
//! 1. 种子派生 (`crate::core`)：身份输入 → 种子哈希。
//! 2. 块扩展：从种子开始自链式哈希，填满整个块。
//! 3. 熵混合：在第一次填满之后继续哈希链，循环覆盖同一块中的段。
//!
//! 每一次哈希的输入都包含上一次的输出，因此单次调用内部无法并行化。
//! 这种顺序代价正是打包方案防止走捷径的来源。

use crate::core::derive_seed_hash_with;
use crate::digest::{PackingContext, PackingHasher, Segment, Sha256Hasher, PACKING_HASH_SIZE};
use crate::error::Error;

/// 熵块的总字节数 (256 KiB)。
pub const DATA_CHUNK_SIZE: usize = 256 * 1024;

/// 每个块包含的段数，也是第一次填满块所需的哈希次数。
pub const HASH_ITERATIONS_PER_BLOCK: usize = DATA_CHUNK_SIZE / PACKING_HASH_SIZE;

/// 块布局的编译期检查。
/// 任何实例化的块大小都必须是 `PACKING_HASH_SIZE` 的非零整数倍。
struct ChunkLayout<const N: usize>;

impl<const N: usize> ChunkLayout<N> {
    const SEGMENTS: usize = {
        assert!(
            N >= PACKING_HASH_SIZE && N % PACKING_HASH_SIZE == 0,
            "chunk size must be a non-zero multiple of PACKING_HASH_SIZE"
        );
        N / PACKING_HASH_SIZE
    };
}

const _: () = assert!(ChunkLayout::<DATA_CHUNK_SIZE>::SEGMENTS == HASH_ITERATIONS_PER_BLOCK);

/// 在堆上分配一个清零的块缓冲区，分配失败时返回 `Error::Allocation` 而不是中止进程。
pub(crate) fn try_alloc_chunk<const N: usize>() -> Result<Box<[u8; N]>, Error> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(N).map_err(|_| Error::Allocation)?;
    buf.resize(N, 0u8);
    buf.into_boxed_slice()
        .try_into()
        .map_err(|_| Error::Allocation)
}

/// 从已计算好的种子（或任意"上一段"）开始填满一个标准大小的块。
pub fn expand_chunk_from_seed(
    seed: &[u8],
    out: &mut [u8; DATA_CHUNK_SIZE],
) -> Result<(), Error> {
    expand_chunk_from_seed_with(&Sha256Hasher, seed, out)
}

/// 块扩展阶段。
///
/// # 算法
/// 把 `seed` 当作第一个"上一段"。每一轮对上一段求摘要，写入输出的下一个空位，
/// 然后把刚写入的段作为下一轮的输入。由于段长整除块长，循环恰好在段边界结束。
///
/// 摘要上下文初始化失败时返回 `Error::HashComputation`，此时 `out` 未被修改。
pub fn expand_chunk_from_seed_with<H: PackingHasher, const N: usize>(
    hasher: &H,
    seed: &[u8],
    out: &mut [u8; N],
) -> Result<(), Error> {
    let segments = ChunkLayout::<N>::SEGMENTS;
    // 先创建上下文再写输出：失败时 out 保持原样
    let mut ctx = hasher.init().map_err(|_| Error::HashComputation)?;

    // 种子是第一个"上一段"
    ctx.update(seed);
    for slot in out.chunks_exact_mut(PACKING_HASH_SIZE).take(segments) {
        // finalize_reset 取出摘要并重置上下文，整个块只用一个上下文
        let segment = ctx.finalize_reset();
        slot.copy_from_slice(&segment);
        // 刚写入的段作为下一轮的输入 (self-chaining)
        ctx.update(&segment);
    }
    Ok(())
}

/// 由身份输入直接计算第一次填满的块（阶段 1 + 2）。
pub fn compute_initial_chunk(
    address: &[u8],
    offset: u64,
    partition_hash: &[u8],
    out: &mut [u8; DATA_CHUNK_SIZE],
) -> Result<(), Error> {
    compute_initial_chunk_with(&Sha256Hasher, address, offset, partition_hash, out)
}

pub fn compute_initial_chunk_with<H: PackingHasher, const N: usize>(
    hasher: &H,
    address: &[u8],
    offset: u64,
    partition_hash: &[u8],
    out: &mut [u8; N],
) -> Result<(), Error> {
    let seed = derive_seed_hash_with(hasher, address, offset, partition_hash)?;
    expand_chunk_from_seed_with(hasher, &seed, out)
}

/// 对标准大小的初始块执行熵混合。
pub fn mix_entropy_chunk(
    initial: &[u8; DATA_CHUNK_SIZE],
    iterations: u32,
    out: &mut [u8; DATA_CHUNK_SIZE],
) -> Result<(), Error> {
    mix_entropy_chunk_with(&Sha256Hasher, initial, iterations, out)
}

/// 熵混合阶段。
///
/// 先把 `initial` 整体复制到 `out`，链段取 `initial` 的最后一段。
/// 对 `HASH_ITERATIONS_PER_BLOCK..iterations` 中的每一个计数：
/// - 目标位置为 `(计数 mod 段数) * PACKING_HASH_SIZE`，超过一轮后循环覆盖；
/// - 对 `链段 ‖ 目标位置覆盖前的内容` 求摘要（先读后写，读到的是上一轮在该位置的值）；
/// - 把摘要写回目标位置，并作为下一轮的链段。
///
/// `iterations` 不超过段数时不做任何哈希，`out` 与 `initial` 完全相同。
///
/// Implementations that read the overwritten segment from the unmixed `initial`
/// chunk produce the same bytes only for `iterations <= 2 * HASH_ITERATIONS_PER_BLOCK`;
/// deeper chunks from this function are not interchangeable with theirs.
pub fn mix_entropy_chunk_with<H: PackingHasher, const N: usize>(
    hasher: &H,
    initial: &[u8; N],
    iterations: u32,
    out: &mut [u8; N],
) -> Result<(), Error> {
    let segments = ChunkLayout::<N>::SEGMENTS;
    // 与扩展阶段相同：上下文就绪之前不触碰 out
    let mut ctx = hasher.init().map_err(|_| Error::HashComputation)?;

    // 混合在 out 上原地进行
    out.copy_from_slice(initial);

    // 哈希链从初始填充的最后一段继续
    let last = (segments - 1) * PACKING_HASH_SIZE;
    let mut chained: Segment = [0u8; PACKING_HASH_SIZE];
    chained.copy_from_slice(&initial[last..]);

    // 计数从段数开始：前 segments 次哈希已经花在初始填充上
    for hash_count in segments..iterations as usize {
        // 目标段按段数取模，超过一轮后回到段 0
        let start = (hash_count % segments) * PACKING_HASH_SIZE;
        let slot = &mut out[start..start + PACKING_HASH_SIZE];

        // 原像 = 链段 ‖ 目标段覆盖前的内容 (read before write)
        ctx.update(&chained);
        ctx.update(slot);
        chained = ctx.finalize_reset();
        // 覆盖目标段，新摘要同时成为下一轮的链段
        slot.copy_from_slice(&chained);
    }
    Ok(())
}

/// 由身份输入计算完整的熵块（阶段 1 + 2 + 3），共执行 `iterations` 次链式哈希。
pub fn compute_entropy_chunk(
    address: &[u8],
    offset: u64,
    partition_hash: &[u8],
    iterations: u32,
    out: &mut [u8; DATA_CHUNK_SIZE],
) -> Result<(), Error> {
    compute_entropy_chunk_with(&Sha256Hasher, address, offset, partition_hash, iterations, out)
}

/// 任一阶段失败都会立即返回，`out` 的内容此时未定义，调用方不得使用。
pub fn compute_entropy_chunk_with<H: PackingHasher, const N: usize>(
    hasher: &H,
    address: &[u8],
    offset: u64,
    partition_hash: &[u8],
    iterations: u32,
    out: &mut [u8; N],
) -> Result<(), Error> {
    // 中间块分配在堆上，分配失败映射为 Allocation
    let mut initial = try_alloc_chunk::<N>()?;
    compute_initial_chunk_with(hasher, address, offset, partition_hash, &mut *initial)?;
    mix_entropy_chunk_with(hasher, &*initial, iterations, out)
}
