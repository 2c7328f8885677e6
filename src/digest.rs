//! 摘要算法模块
//! Packing digest module
//!
//! 熵块的每一个段 (segment) 都是一次摘要运算的输出。本模块把"用哪种摘要"
//! 抽象成 `PackingHasher` 特征，核心算法只依赖这个特征：
//! 生产环境使用 SHA-256，测试可以替换成简化的确定性函数。

use sha2::{Digest, Sha256};
use thiserror::Error;

/// 单个段的字节长度，也就是所选摘要算法的输出长度。
/// Digest output size of the packing hash algorithm.
pub const PACKING_HASH_SIZE: usize = 32;

/// 一个摘要大小的段。种子哈希也使用同样的表示。
pub type Segment = [u8; PACKING_HASH_SIZE];

/// 打包使用的摘要算法标识。
/// Identifies the digest algorithm behind `PACKING_HASH_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// 算法输出长度 (字节)。两种算法都必须等于 `PACKING_HASH_SIZE`。
    pub const fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 => 32,
        }
    }
}

/// 与外部调用者约定的规范打包算法。
pub const PACKING_HASH_ALG: HashAlgorithm = HashAlgorithm::Sha256;

const _: () = assert!(PACKING_HASH_ALG.output_size() == PACKING_HASH_SIZE);

/// 摘要上下文初始化失败。
/// 调用方根据所处阶段把它映射为 `Error::SeedHash` 或 `Error::HashComputation`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("digest context could not be initialized")]
pub struct ContextInitError;

/// 可复用的增量摘要上下文。
pub trait PackingContext {
    /// 向当前摘要追加数据。
    fn update(&mut self, data: &[u8]);

    /// 输出摘要并把上下文重置为初始状态，以便下一个段复用。
    fn finalize_reset(&mut self) -> Segment;
}

/// 打包摘要算法。
/// A digest algorithm producing `PACKING_HASH_SIZE`-byte segments.
pub trait PackingHasher {
    type Context: PackingContext;

    /// 创建一个新的摘要上下文。每个阶段只调用一次，然后在循环中复用。
    fn init(&self) -> Result<Self::Context, ContextInitError>;

    /// 一次性计算 `data` 的摘要。
    fn digest(&self, data: &[u8]) -> Result<Segment, ContextInitError> {
        let mut ctx = self.init()?;
        ctx.update(data);
        Ok(ctx.finalize_reset())
    }
}

/// SHA-256，规范的打包算法。
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

/// SHA-256 增量上下文
#[derive(Debug, Clone, Default)]
pub struct Sha256Context(Sha256);

impl PackingContext for Sha256Context {
    #[inline]
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    #[inline]
    fn finalize_reset(&mut self) -> Segment {
        let result = Digest::finalize_reset(&mut self.0);
        let mut output = [0u8; PACKING_HASH_SIZE];
        output.copy_from_slice(&result);
        output
    }
}

impl PackingHasher for Sha256Hasher {
    type Context = Sha256Context;

    fn init(&self) -> Result<Self::Context, ContextInitError> {
        Ok(Sha256Context(Sha256::new()))
    }
}

/// BLAKE3，可选的替代算法。输出同样为 32 字节，但与 SHA-256 的结果不兼容。
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

/// BLAKE3 增量上下文
#[derive(Debug, Clone, Default)]
pub struct Blake3Context(blake3::Hasher);

impl PackingContext for Blake3Context {
    #[inline]
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    #[inline]
    fn finalize_reset(&mut self) -> Segment {
        let hash = self.0.finalize();
        self.0.reset();
        *hash.as_bytes()
    }
}

impl PackingHasher for Blake3Hasher {
    type Context = Blake3Context;

    fn init(&self) -> Result<Self::Context, ContextInitError> {
        Ok(Blake3Context(blake3::Hasher::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        // SHA-256("abc")
        let digest = Sha256Hasher.digest(b"abc").expect("sha256 digest");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn context_is_reusable_after_finalize_reset() {
        // 复用上下文必须与新建上下文得到相同的结果
        let mut ctx = Sha256Hasher.init().expect("init");
        ctx.update(b"first");
        let _ = ctx.finalize_reset();
        ctx.update(b"abc");
        assert_eq!(
            ctx.finalize_reset(),
            Sha256Hasher.digest(b"abc").expect("digest")
        );

        let mut ctx = Blake3Hasher.init().expect("init");
        ctx.update(b"first");
        let _ = ctx.finalize_reset();
        ctx.update(b"abc");
        assert_eq!(ctx.finalize_reset(), *blake3::hash(b"abc").as_bytes());
    }

    #[test]
    fn incremental_updates_equal_one_shot() {
        let mut ctx = Sha256Hasher.init().expect("init");
        ctx.update(b"ab");
        ctx.update(b"c");
        assert_eq!(
            ctx.finalize_reset(),
            Sha256Hasher.digest(b"abc").expect("digest")
        );
    }

    #[test]
    fn algorithm_identifier_round_trips_through_serde() {
        let json = serde_json::to_string(&PACKING_HASH_ALG).expect("serialize");
        assert_eq!(json, "\"sha256\"");
        assert_eq!(PACKING_HASH_ALG.output_size(), PACKING_HASH_SIZE);
    }
}
