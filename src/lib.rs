//! 容量证明熵块核心库
//! Proof-of-capacity entropy chunk library.
//!
//! 本库把矿工地址、分区内偏移和分区哈希绑定成一个确定性、计算代价高昂的熵块。
//! 存储块与熵块组合（打包）之后，只有知道正确身份输入的一方才能廉价地复现或校验打包结果，
//! 而从零开始计算则必须顺序执行 `iterations` 次哈希。

// 声明子模块
pub mod core; // 种子哈希派生
pub mod digest; // 摘要算法抽象 (SHA-256 / BLAKE3)
pub mod engine; // 多线程区间计算引擎
pub mod entropy; // 块扩展与熵混合
pub mod error; // 错误类型定义
pub mod stream; // 并发流控制工具
pub mod types; // 数据结构定义 (PackingConfig, EntropyChunk)

#[cfg(test)]
mod testing;

// 重新导出 (Re-export) 常用类型，方便用户直接从 crate 根路径引用
pub use crate::core::{derive_seed_hash, derive_seed_hash_with};
pub use crate::digest::{
    Blake3Hasher, ContextInitError, HashAlgorithm, PackingContext, PackingHasher, Segment,
    Sha256Hasher, PACKING_HASH_ALG, PACKING_HASH_SIZE,
};
pub use crate::engine::{EntropyEngine, EntropyEngineBuilder, PackingEngine};
pub use crate::entropy::{
    compute_entropy_chunk, compute_entropy_chunk_with, compute_initial_chunk,
    compute_initial_chunk_with, expand_chunk_from_seed, expand_chunk_from_seed_with,
    mix_entropy_chunk, mix_entropy_chunk_with, DATA_CHUNK_SIZE, HASH_ITERATIONS_PER_BLOCK,
};
pub use crate::error::{Error, VerifyError};
pub use crate::types::{EntropyChunk, PackingConfig, DEFAULT_PACKING_ITERATIONS};
