//! crates/signature/src/builder.rs
//!
//! Signature map construction from a base stream.

use std::io::Read;
use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use checksums::strong::{StrongAlgorithm, StrongHash};
use checksums::{WeakAlgorithm, WeakChecksum};

use crate::config::SignatureConfig;
use crate::error::SignatureError;
use crate::hashing::hash_blocks;
use crate::map::SignatureMap;
use crate::stream::{ChunkCursor, open_readable};

/// Builds a [`SignatureMap`] by reading a base stream once.
///
/// The stream is read through a buffer of `config.buffer_size()` bytes. Every
/// whole block in the buffer is hashed, the remainder is carried into the
/// next read, and a short final block is hashed once the stream ends.
///
/// # Examples
///
/// ```
/// use signature::{SignatureConfig, SignatureMapBuilder};
///
/// let config = SignatureConfig::new(4, 64).expect("valid sizes");
/// let map = SignatureMapBuilder::new(config)
///     .build(&b"abcdefghij"[..])
///     .expect("in-memory build");
///
/// assert_eq!(map.block_count(), 3);
/// assert_eq!(map.blocks()[2].length(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct SignatureMapBuilder<W = WeakAlgorithm, S = StrongAlgorithm> {
    config: SignatureConfig,
    weak: W,
    strong: S,
    cancel: Option<CancellationToken>,
}

impl SignatureMapBuilder {
    /// Uses Adler-32 and SHA-1.
    #[must_use]
    pub fn new(config: SignatureConfig) -> Self {
        Self::with_algorithms(config, WeakAlgorithm::default(), StrongAlgorithm::default())
    }
}

impl<W, S> SignatureMapBuilder<W, S> {
    /// Uses the given checksum algorithms.
    #[must_use]
    pub const fn with_algorithms(config: SignatureConfig, weak: W, strong: S) -> Self {
        Self {
            config,
            weak,
            strong,
            cancel: None,
        }
    }

    /// Replaces the weak checksum algorithm.
    pub fn weak<W2>(self, weak: W2) -> SignatureMapBuilder<W2, S> {
        SignatureMapBuilder {
            config: self.config,
            weak,
            strong: self.strong,
            cancel: self.cancel,
        }
    }

    /// Replaces the strong hash algorithm.
    pub fn strong<S2>(self, strong: S2) -> SignatureMapBuilder<W, S2> {
        SignatureMapBuilder {
            config: self.config,
            weak: self.weak,
            strong,
            cancel: self.cancel,
        }
    }

    /// Aborts the build with [`SignatureError::Cancelled`] once `token` fires.
    ///
    /// The token is checked before every buffer refill.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the sizing used by the builder.
    #[must_use]
    pub const fn config(&self) -> SignatureConfig {
        self.config
    }
}

impl<W: WeakChecksum, S: StrongHash> SignatureMapBuilder<W, S> {
    /// Reads `reader` to the end and returns the frozen map.
    ///
    /// An empty stream yields an empty map.
    #[instrument(
        skip_all,
        name = "build_signature_map",
        fields(block_size = self.config.block_size(), buffer_size = self.config.buffer_size())
    )]
    pub fn build<R: Read>(self, reader: R) -> Result<SignatureMap<W, S>, SignatureError> {
        let mut cursor = ChunkCursor::new(reader, self.config.buffer_size());
        let capacity = cursor.capacity();
        let mut absorber = Absorber::new(self);
        loop {
            absorber.check_cancelled()?;
            let region = cursor.fill(capacity)?;
            if region.len() < absorber.block_size() {
                break;
            }
            let used = absorber.absorb(region);
            cursor.consume(used);
        }
        Ok(absorber.finish(cursor.buffered()))
    }

    /// Opens `path` and builds a map from its contents.
    pub fn build_path(self, path: impl AsRef<Path>) -> Result<SignatureMap<W, S>, SignatureError> {
        let file = open_readable(path.as_ref())?;
        self.build(file)
    }

    /// Asynchronous counterpart of [`build`](Self::build).
    #[cfg(feature = "async")]
    #[instrument(
        skip_all,
        name = "build_signature_map",
        fields(block_size = self.config.block_size(), buffer_size = self.config.buffer_size())
    )]
    pub async fn build_async<R>(self, reader: R) -> Result<SignatureMap<W, S>, SignatureError>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut cursor = ChunkCursor::new(reader, self.config.buffer_size());
        let capacity = cursor.capacity();
        let mut absorber = Absorber::new(self);
        loop {
            absorber.check_cancelled()?;
            let region = cursor.fill_async(capacity).await?;
            if region.len() < absorber.block_size() {
                break;
            }
            let used = absorber.absorb(region);
            cursor.consume(used);
        }
        Ok(absorber.finish(cursor.buffered()))
    }
}

/// Builds a map with the default algorithms.
///
/// Sizes are validated before `reader` is touched.
pub fn build_signature_map<R: Read>(
    reader: R,
    block_size: usize,
    buffer_size: usize,
) -> Result<SignatureMap, SignatureError> {
    let config = SignatureConfig::new(block_size, buffer_size)?;
    SignatureMapBuilder::new(config).build(reader)
}

/// Incremental block hashing shared by the sync and async drivers.
struct Absorber<W, S> {
    map: SignatureMap<W, S>,
    cancel: Option<CancellationToken>,
}

impl<W: WeakChecksum, S: StrongHash> Absorber<W, S> {
    fn new(builder: SignatureMapBuilder<W, S>) -> Self {
        Self {
            map: SignatureMap::empty(builder.config, builder.weak, builder.strong),
            cancel: builder.cancel,
        }
    }

    fn block_size(&self) -> usize {
        self.map.block_size()
    }

    fn check_cancelled(&self) -> Result<(), SignatureError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(SignatureError::Cancelled {
                bytes: self.map.base_len(),
            }),
            _ => Ok(()),
        }
    }

    /// Hashes every whole block of `region` and returns the bytes used.
    fn absorb(&mut self, region: &[u8]) -> usize {
        let block_size = self.block_size();
        let whole = region.len() - region.len() % block_size;
        self.extend(&region[..whole]);
        whole
    }

    fn extend(&mut self, bytes: &[u8]) {
        let blocks = hash_blocks(
            bytes,
            self.block_size(),
            self.map.block_count() as u64,
            self.map.base_len(),
            self.map.weak_algorithm(),
            self.map.strong_algorithm(),
        );
        for block in blocks {
            self.map.push(block);
        }
    }

    fn finish(mut self, tail: &[u8]) -> SignatureMap<W, S> {
        if !tail.is_empty() {
            self.extend(tail);
        }
        debug!(
            blocks = self.map.block_count(),
            buckets = self.map.bucket_count(),
            collisions = self.map.collision_count(),
            base_len = self.map.base_len(),
            "signature map built"
        );
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use checksums::strong::StrongSum;
    use std::io::{self, Cursor};

    fn build(data: &[u8], block_size: usize, buffer_size: usize) -> SignatureMap {
        build_signature_map(Cursor::new(data.to_vec()), block_size, buffer_size).expect("build")
    }

    #[test]
    fn blocks_partition_the_base() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let map = build(&data, 64, 200);
        assert_eq!(map.block_count(), 16);
        assert_eq!(map.base_len(), 1000);
        let mut expected_offset = 0;
        for (index, block) in map.blocks().iter().enumerate() {
            assert_eq!(block.index(), index as u64);
            assert_eq!(block.offset(), expected_offset);
            let end = (block.offset() as usize + 64).min(data.len());
            let bytes = &data[block.offset() as usize..end];
            assert_eq!(block.length() as usize, bytes.len());
            assert_eq!(block.weak(), WeakAlgorithm::Adler32.calculate(bytes));
            assert_eq!(block.strong(), &StrongAlgorithm::Sha1.digest(bytes));
            expected_offset += u64::from(block.length());
        }
        assert_eq!(map.blocks().last().map(|b| b.length()), Some(1000 % 64));
    }

    #[test]
    fn buffer_size_does_not_change_the_map() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 31 % 251) as u8).collect();
        let small = build(&data, 100, 101);
        let large = build(&data, 100, 1 << 20);
        assert_eq!(small.blocks(), large.blocks());
    }

    #[test]
    fn empty_base_gives_empty_map() {
        let map = build(&[], 16, 32);
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), 0);
    }

    #[test]
    fn duplicate_blocks_share_a_bucket() {
        let data = [b"ABCD".as_slice(), b"ABCD", b"WXYZ"].concat();
        let map = build(&data, 4, 8);
        let weak = WeakAlgorithm::Adler32.calculate(b"ABCD");
        let offsets: Vec<_> = map.lookup(weak).map(|b| b.offset()).collect();
        assert_eq!(offsets, [0, 4]);
        let strong = StrongAlgorithm::Sha1.digest(b"ABCD");
        assert_eq!(map.find_by_strong(&strong).map(|b| b.offset()), Some(0));
    }

    #[test]
    fn invalid_sizes_fail_before_reading() {
        struct Untouchable;
        impl Read for Untouchable {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                panic!("reader must not be touched");
            }
        }
        let error = build_signature_map(Untouchable, 4096, 1024).unwrap_err();
        assert!(matches!(
            error,
            SignatureError::Config(ConfigError::BufferTooSmall { .. })
        ));
        assert!(matches!(
            build_signature_map(Untouchable, 0, 1024),
            Err(SignatureError::Config(ConfigError::ZeroBlockSize))
        ));
    }

    #[test]
    fn read_errors_are_reported() {
        struct Failing(usize);
        impl Read for Failing {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 == 0 {
                    return Err(io::Error::other("device gone"));
                }
                let n = self.0.min(buf.len());
                buf[..n].fill(1);
                self.0 -= n;
                Ok(n)
            }
        }
        let error = build_signature_map(Failing(10), 4, 8).unwrap_err();
        assert!(matches!(error, SignatureError::Io(_)));
    }

    #[test]
    fn cancelled_token_stops_the_build() {
        let token = CancellationToken::new();
        token.cancel();
        let config = SignatureConfig::new(4, 8).expect("config");
        let error = SignatureMapBuilder::new(config)
            .cancel_on(token)
            .build(Cursor::new(vec![0u8; 64]))
            .unwrap_err();
        assert!(matches!(error, SignatureError::Cancelled { bytes: 0 }));
    }

    #[test]
    fn alternative_algorithms_are_used() {
        let config = SignatureConfig::new(3, 9).expect("config");
        let map = SignatureMapBuilder::new(config)
            .weak(checksums::RsyncRolling)
            .strong(StrongAlgorithm::Xxh64 { seed: 7 })
            .build(&b"abcdef"[..])
            .expect("build");
        assert_eq!(map.blocks()[1].weak(), checksums::RsyncRolling.calculate(b"def"));
        assert_eq!(map.blocks()[1].strong().len(), 8);
        assert_ne!(map.blocks()[1].strong(), &StrongSum::default());
    }

    #[test]
    fn build_path_reports_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = SignatureMapBuilder::new(SignatureConfig::default())
            .build_path(dir.path())
            .unwrap_err();
        assert!(matches!(error, SignatureError::StreamState(_)));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_build_matches_sync_build() {
        let data: Vec<u8> = (0..3000u32).map(|i| (i % 97) as u8).collect();
        let config = SignatureConfig::new(128, 300).expect("config");
        let sync = SignatureMapBuilder::new(config)
            .build(&data[..])
            .expect("sync");
        let async_map = SignatureMapBuilder::new(config)
            .build_async(&data[..])
            .await
            .expect("async");
        assert_eq!(sync.blocks(), async_map.blocks());
    }
}
