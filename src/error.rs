//! 错误处理模块
//! Error handling module
//!
//! 本文件定义了熵块计算、范围引擎以及校验过程中可能出现的错误类型。
//! 所有错误对当前调用都是终止性的：库内部从不重试。

use thiserror::Error; // `thiserror` 的 `Error` 派生宏，为枚举实现 `std::error::Error`。

/// 库的一般性错误。
/// General errors for entropy computation and the range engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// 无法为所需的缓冲区分配内存（种子拼接缓冲区或中间熵块）。
    #[error("failed to allocate entropy buffer")]
    Allocation,

    /// 种子哈希的摘要上下文无法初始化。
    /// 此时尚未进行任何哈希计算，也不会返回部分种子。
    #[error("failed to initialize seed hash context")]
    SeedHash,

    /// 块扩展或熵混合阶段的摘要上下文无法初始化。
    #[error("failed to initialize chunk hash context")]
    HashComputation,

    /// 当提供的配置参数无效时（例如线程数为 0，或者迭代次数为 0）。
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// 工作线程在计算过程中 panic，区间结果不完整。
    #[error("entropy worker failed: {0}")]
    WorkerFailed(String),
}

/// 校验熵块时可能出现的错误。
/// Errors raised while checking a chunk against its identity inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// 重新计算的熵块与提供的熵块不一致。
    #[error("entropy chunk does not match its address, offset and partition")]
    Mismatch,

    /// 提供的数据长度不是 `DATA_CHUNK_SIZE`。
    #[error("malformed entropy chunk")]
    Malformed,

    /// 重新计算熵块本身失败。
    #[error(transparent)]
    Compute(#[from] Error),
}
