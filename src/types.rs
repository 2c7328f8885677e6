//! 类型定义模块
//! Types definition module
//!
//! 本模块定义了打包配置 (PackingConfig) 与引擎输出的熵块 (EntropyChunk)，
//! 同时包含熵块的校验逻辑。

use crate::digest::PACKING_HASH_SIZE;
use crate::entropy::{
    compute_entropy_chunk, try_alloc_chunk, DATA_CHUNK_SIZE, HASH_ITERATIONS_PER_BLOCK,
};
use crate::error::{Error, VerifyError};

/// 默认打包深度：一次完整填充加一整轮回绕混合。
pub const DEFAULT_PACKING_ITERATIONS: u32 = (HASH_ITERATIONS_PER_BLOCK * 2) as u32;

/// 打包配置结构体。
/// Configuration for the packing depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PackingConfig {
    /// 链式哈希的总次数。
    /// 不超过 `HASH_ITERATIONS_PER_BLOCK` 时只做初始填充。
    pub iterations: u32,
}

impl PackingConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.iterations == 0 {
            return Err(Error::InvalidConfig("iterations must be >= 1".into()));
        }
        Ok(())
    }

    /// 该配置是否会触发熵混合阶段。
    pub fn mixes(&self) -> bool {
        self.iterations as usize > HASH_ITERATIONS_PER_BLOCK
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PACKING_ITERATIONS,
        }
    }
}

/// 绑定到某个分区偏移的熵块。
/// An entropy chunk together with the offset it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyChunk {
    /// 分区内的块偏移。
    pub offset: u64,

    /// 完整的 `DATA_CHUNK_SIZE` 字节熵。放在堆上，避免大数组占满线程栈。
    pub bytes: Box<[u8; DATA_CHUNK_SIZE]>,
}

impl EntropyChunk {
    /// 计算某个偏移的熵块。
    pub fn compute(
        address: &[u8],
        offset: u64,
        partition_hash: &[u8],
        config: PackingConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let mut bytes = try_alloc_chunk::<DATA_CHUNK_SIZE>()?;
        compute_entropy_chunk(address, offset, partition_hash, config.iterations, &mut *bytes)?;
        Ok(Self { offset, bytes })
    }

    /// 从外部提供的字节构造熵块，长度必须恰好为 `DATA_CHUNK_SIZE`。
    pub fn from_bytes(offset: u64, bytes: &[u8]) -> Result<Self, VerifyError> {
        if bytes.len() != DATA_CHUNK_SIZE {
            return Err(VerifyError::Malformed);
        }
        let mut owned = try_alloc_chunk::<DATA_CHUNK_SIZE>()?;
        owned.copy_from_slice(bytes);
        Ok(Self {
            offset,
            bytes: owned,
        })
    }

    /// 块中的段数。
    pub const fn segment_count() -> usize {
        HASH_ITERATIONS_PER_BLOCK
    }

    /// 返回第 `index` 个段，越界时返回 `None`。
    pub fn segment(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(PACKING_HASH_SIZE)?;
        self.bytes.get(start..start.checked_add(PACKING_HASH_SIZE)?)
    }

    /// 校验熵块是否与给定的身份输入一致。
    ///
    /// # 验证流程
    /// 1. 使用 `address`、`self.offset`、`partition_hash` 与配置的深度重新计算熵块。
    /// 2. 逐字节比较，不一致时返回 `VerifyError::Mismatch`。
    pub fn verify(
        &self,
        address: &[u8],
        partition_hash: &[u8],
        config: PackingConfig,
    ) -> Result<(), VerifyError> {
        let expected = Self::compute(address, self.offset, partition_hash, config)?;
        if expected.bytes != self.bytes {
            return Err(VerifyError::Mismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 一次回绕即可覆盖混合阶段，同时让测试保持快速
    fn shallow() -> PackingConfig {
        PackingConfig {
            iterations: HASH_ITERATIONS_PER_BLOCK as u32 + 3,
        }
    }

    #[test]
    fn verify_accepts_recomputed_chunk() {
        let chunk = EntropyChunk::compute(b"miner", 4, b"partition", shallow()).expect("compute");
        assert_eq!(chunk.bytes.len(), DATA_CHUNK_SIZE);
        chunk
            .verify(b"miner", b"partition", shallow())
            .expect("chunk should verify");
    }

    #[test]
    fn verify_rejects_wrong_identity_or_depth() {
        let chunk = EntropyChunk::compute(b"miner", 4, b"partition", shallow()).expect("compute");

        let err = chunk
            .verify(b"other", b"partition", shallow())
            .expect_err("wrong address should be rejected");
        assert_eq!(err, VerifyError::Mismatch);

        let err = chunk
            .verify(b"miner", b"partition", PackingConfig { iterations: 1 })
            .expect_err("wrong depth should be rejected");
        assert_eq!(err, VerifyError::Mismatch);
    }

    #[test]
    fn verify_rejects_tampered_bytes() {
        let chunk = EntropyChunk::compute(b"miner", 4, b"partition", shallow()).expect("compute");
        let mut tampered = chunk.bytes.to_vec();
        tampered[DATA_CHUNK_SIZE / 2] ^= 1;
        let tampered = EntropyChunk::from_bytes(4, &tampered).expect("sized bytes");
        assert_eq!(
            tampered.verify(b"miner", b"partition", shallow()),
            Err(VerifyError::Mismatch)
        );
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = EntropyChunk::from_bytes(0, &[0u8; 31]).expect_err("short input");
        assert_eq!(err, VerifyError::Malformed);
    }

    #[test]
    fn segment_lookup_is_bounds_checked() {
        let chunk = EntropyChunk::from_bytes(0, &vec![7u8; DATA_CHUNK_SIZE]).expect("chunk");
        assert_eq!(chunk.segment(0), Some(&[7u8; PACKING_HASH_SIZE][..]));
        assert!(chunk.segment(EntropyChunk::segment_count() - 1).is_some());
        assert!(chunk.segment(EntropyChunk::segment_count()).is_none());
        assert!(chunk.segment(usize::MAX).is_none());
    }

    #[test]
    fn config_validation_and_serde() {
        assert!(PackingConfig { iterations: 0 }.validate().is_err());
        assert!(!PackingConfig { iterations: 1 }.mixes());
        assert!(PackingConfig::default().mixes());

        let json = serde_json::to_string(&PackingConfig { iterations: 42 }).expect("serialize");
        assert_eq!(json, r#"{"iterations":42}"#);
        let back: PackingConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.iterations, 42);
    }
}
