//! crates/signature/src/config.rs
//!
//! Block and buffer sizing for signature maps and delta scans.

use thiserror::Error;

/// Default number of bytes per block.
pub const DEFAULT_BLOCK_SIZE: usize = 2048;
/// Default read-ahead buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Smallest block size returned by [`suggest_block_size`].
const MIN_SUGGESTED_BLOCK_SIZE: u64 = 700;
/// Largest block size returned by [`suggest_block_size`].
const MAX_SUGGESTED_BLOCK_SIZE: u64 = 1 << 17;

/// Invalid block or buffer sizing, reported before any input is read.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    /// The block size was zero.
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
    /// The buffer size was zero.
    #[error("buffer size must be greater than zero")]
    ZeroBufferSize,
    /// The buffer cannot hold a full block plus lookahead.
    #[error("buffer size {buffer_size} must be larger than block size {block_size}")]
    BufferTooSmall {
        /// Requested block size.
        block_size: usize,
        /// Requested buffer size.
        buffer_size: usize,
    },
    /// Block lengths are recorded as 32-bit values.
    #[error("block size {block_size} exceeds the 32-bit block length limit")]
    BlockSizeTooLarge {
        /// Requested block size.
        block_size: usize,
    },
}

/// Checks a block/buffer size pair.
pub fn validate_sizes(block_size: usize, buffer_size: usize) -> Result<(), ConfigError> {
    if block_size == 0 {
        return Err(ConfigError::ZeroBlockSize);
    }
    if buffer_size == 0 {
        return Err(ConfigError::ZeroBufferSize);
    }
    if buffer_size <= block_size {
        return Err(ConfigError::BufferTooSmall {
            block_size,
            buffer_size,
        });
    }
    if u32::try_from(block_size).is_err() {
        return Err(ConfigError::BlockSizeTooLarge { block_size });
    }
    Ok(())
}

/// Validated block and buffer sizes.
///
/// # Examples
///
/// ```
/// use signature::{ConfigError, SignatureConfig};
///
/// let config = SignatureConfig::builder()
///     .block_size(64)
///     .buffer_size(1024 * 1024)
///     .build()
///     .expect("valid sizes");
/// assert_eq!(config.block_size(), 64);
///
/// let error = SignatureConfig::new(4096, 4096).unwrap_err();
/// assert!(matches!(error, ConfigError::BufferTooSmall { .. }));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawConfig"))]
pub struct SignatureConfig {
    block_size: u32,
    buffer_size: usize,
}

impl SignatureConfig {
    /// Validates and wraps a block/buffer size pair.
    pub fn new(block_size: usize, buffer_size: usize) -> Result<Self, ConfigError> {
        validate_sizes(block_size, buffer_size)?;
        Ok(Self {
            block_size: block_size as u32,
            buffer_size,
        })
    }

    /// Starts a builder seeded with the defaults.
    #[must_use]
    pub const fn builder() -> SignatureConfigBuilder {
        SignatureConfigBuilder {
            block_size: DEFAULT_BLOCK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Returns the number of bytes per block.
    #[inline]
    #[must_use]
    pub const fn block_size(self) -> usize {
        self.block_size as usize
    }

    /// Returns the block size as recorded in block descriptors.
    #[inline]
    #[must_use]
    pub const fn block_len(self) -> u32 {
        self.block_size
    }

    /// Returns the read-ahead buffer size.
    #[inline]
    #[must_use]
    pub const fn buffer_size(self) -> usize {
        self.buffer_size
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawConfig {
    block_size: usize,
    buffer_size: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawConfig> for SignatureConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Self::new(raw.block_size, raw.buffer_size)
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE as u32,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Builder for [`SignatureConfig`]; validation happens in [`build`](Self::build).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureConfigBuilder {
    block_size: usize,
    buffer_size: usize,
}

impl SignatureConfigBuilder {
    /// Sets the number of bytes per block.
    pub const fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the read-ahead buffer size.
    pub const fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Validates the sizes.
    pub fn build(self) -> Result<SignatureConfig, ConfigError> {
        SignatureConfig::new(self.block_size, self.buffer_size)
    }
}

impl Default for SignatureConfigBuilder {
    fn default() -> Self {
        SignatureConfig::builder()
    }
}

/// Suggests a block size close to the square root of `base_len`.
///
/// Small inputs use 700-byte blocks; the result never exceeds 128 KiB. This
/// is upstream rsync's `sum_sizes_sqroot()` heuristic, which balances the
/// number of blocks against the cost of a miss.
#[must_use]
pub fn suggest_block_size(base_len: u64) -> usize {
    if base_len <= MIN_SUGGESTED_BLOCK_SIZE * MIN_SUGGESTED_BLOCK_SIZE {
        return MIN_SUGGESTED_BLOCK_SIZE as usize;
    }

    let mut c: u64 = 1;
    let mut l = base_len;
    while l >> 2 != 0 {
        c <<= 1;
        l >>= 2;
    }

    if c >= MAX_SUGGESTED_BLOCK_SIZE {
        return MAX_SUGGESTED_BLOCK_SIZE as usize;
    }

    let mut block_size = 0u64;
    let mut current = c;
    while current >= 8 {
        block_size |= current;
        let candidate = u128::from(block_size);
        if u128::from(base_len) < candidate * candidate {
            block_size &= !current;
        }
        current >>= 1;
    }

    block_size.max(MIN_SUGGESTED_BLOCK_SIZE) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SignatureConfig::default();
        assert_eq!(config.block_size(), 2048);
        assert_eq!(config.buffer_size(), 4 * 1024 * 1024);
        assert_eq!(SignatureConfig::builder().build(), Ok(config));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert_eq!(SignatureConfig::new(0, 10), Err(ConfigError::ZeroBlockSize));
        assert_eq!(SignatureConfig::new(10, 0), Err(ConfigError::ZeroBufferSize));
        assert_eq!(SignatureConfig::new(0, 0), Err(ConfigError::ZeroBlockSize));
    }

    #[test]
    fn buffer_must_exceed_block() {
        assert_eq!(
            SignatureConfig::new(64, 64),
            Err(ConfigError::BufferTooSmall {
                block_size: 64,
                buffer_size: 64
            })
        );
        assert_eq!(
            SignatureConfig::new(64, 32),
            Err(ConfigError::BufferTooSmall {
                block_size: 64,
                buffer_size: 32
            })
        );
        assert!(SignatureConfig::new(64, 65).is_ok());
        assert!(SignatureConfig::new(1, 2).is_ok());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_blocks_are_rejected() {
        let block_size = u32::MAX as usize + 1;
        assert_eq!(
            SignatureConfig::new(block_size, block_size + 1),
            Err(ConfigError::BlockSizeTooLarge { block_size })
        );
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = SignatureConfig::builder()
            .block_size(16)
            .buffer_size(4096)
            .build()
            .expect("valid");
        assert_eq!(config.block_size(), 16);
        assert_eq!(config.block_len(), 16);
        assert_eq!(config.buffer_size(), 4096);
    }

    #[test]
    fn error_messages_mention_sizes() {
        let message = ConfigError::BufferTooSmall {
            block_size: 4096,
            buffer_size: 1024,
        }
        .to_string();
        assert!(message.contains("4096"));
        assert!(message.contains("1024"));
    }

    #[test]
    fn suggested_block_size_for_small_inputs_is_700() {
        assert_eq!(suggest_block_size(0), 700);
        assert_eq!(suggest_block_size(700 * 700), 700);
    }

    #[test]
    fn suggested_block_size_tracks_square_root() {
        assert_eq!(suggest_block_size(10 * 1024 * 1024), 3_232);
        let size = suggest_block_size(1 << 30);
        assert!((size as u64).pow(2) <= 1 << 30);
        assert_eq!(size % 8, 0);
    }

    #[test]
    fn suggested_block_size_is_capped() {
        assert_eq!(suggest_block_size(u64::MAX), 1 << 17);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialized_sizes_are_validated() {
        let zero = serde_json::from_str::<SignatureConfig>(r#"{"block_size":0,"buffer_size":8}"#);
        assert!(zero.is_err());

        let small =
            serde_json::from_str::<SignatureConfig>(r#"{"block_size":64,"buffer_size":64}"#);
        assert!(small.is_err());

        let config: SignatureConfig =
            serde_json::from_str(r#"{"block_size":64,"buffer_size":128}"#).expect("valid sizes");
        assert_eq!(config, SignatureConfig::new(64, 128).expect("valid sizes"));
    }
}
