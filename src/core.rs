//! 核心工具函数模块
//! Core utilities module
//!
//! 本模块负责把三个身份输入（矿工地址、分区内偏移、分区哈希）合成为一个
//! 固定长度的种子哈希 (seed hash)，它是整条哈希链的起点。

use crate::digest::{PackingContext, PackingHasher, Segment, Sha256Hasher};
use crate::error::Error;

/// 使用规范算法 (SHA-256) 派生种子哈希。
///
/// # 参数
/// * `address`: 矿工地址，可以为空。
/// * `offset`: 分区内的块偏移，不做范围检查。
/// * `partition_hash`: 分区标识，可以为空。
///
/// # 返回值
/// * `Segment`: `address ‖ partition_hash ‖ offset` 的摘要。
pub fn derive_seed_hash(
    address: &[u8],
    offset: u64,
    partition_hash: &[u8],
) -> Result<Segment, Error> {
    derive_seed_hash_with(&Sha256Hasher, address, offset, partition_hash)
}

/// 使用任意 `PackingHasher` 派生种子哈希。
///
/// 拼接顺序固定为：地址字节、分区哈希字节、偏移的 8 个原始字节。
/// 偏移按小端序 (little-endian) 编码，在所有受支持的小端平台上与本机字节序一致，
/// 同时保证大端机器上得到相同的熵块。
pub fn derive_seed_hash_with<H: PackingHasher>(
    hasher: &H,
    address: &[u8],
    offset: u64,
    partition_hash: &[u8],
) -> Result<Segment, Error> {
    let offset_bytes = offset.to_le_bytes();

    // 长度溢出与分配失败一样，都意味着无法得到拼接缓冲区。
    let input_len = address
        .len()
        .checked_add(partition_hash.len())
        .and_then(|len| len.checked_add(offset_bytes.len()))
        .ok_or(Error::Allocation)?;

    let mut input = Vec::new();
    input
        .try_reserve_exact(input_len)
        .map_err(|_| Error::Allocation)?;
    input.extend_from_slice(address);
    input.extend_from_slice(partition_hash);
    input.extend_from_slice(&offset_bytes);

    let mut ctx = hasher.init().map_err(|_| Error::SeedHash)?;
    ctx.update(&input);
    Ok(ctx.finalize_reset())
}
