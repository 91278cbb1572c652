//! Strong digests used to confirm weak checksum candidates.
//!
//! Two layers live here. [`StrongDigest`] is the streaming interface each
//! concrete hasher implements ([`Md4`], [`Md5`], [`Sha1`], [`Sha256`],
//! [`Sha384`], [`Xxh64`], [`Xxh3`]). [`StrongHash`] is the object-level
//! contract the signature map and delta scanner depend on; it always returns
//! an owned [`StrongSum`] so digests of different widths compare byte for
//! byte. [`StrongAlgorithm`] selects one of the built-in hashers.
//!
//! Hashing a range delivered as several segments yields exactly the digest of
//! the same bytes delivered contiguously, because every segment is streamed
//! through the same hasher state.

use std::fmt;
use std::io::IoSlice;
use std::str::FromStr;

mod md4;
mod md5;
mod sha;
mod sum;
mod xxhash;

pub use self::md4::Md4;
pub use self::md5::Md5;
pub use self::sha::{Sha1, Sha256, Sha384};
pub use self::sum::StrongSum;
pub use self::xxhash::{Xxh3, Xxh64};

use crate::error::UnknownAlgorithmError;

/// Streaming interface implemented by every strong hasher.
pub trait StrongDigest: Sized {
    /// Seed accepted by [`with_seed`](Self::with_seed); `()` for unseeded hashes.
    type Seed: Default;
    /// Fixed-width digest output.
    type Digest: AsRef<[u8]>;
    /// Width of [`Self::Digest`] in bytes.
    const DIGEST_LEN: usize;

    /// Creates a hasher primed with `seed`.
    fn with_seed(seed: Self::Seed) -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest.
    fn finalize(self) -> Self::Digest;

    /// Computes the digest of `data` with the default seed.
    #[must_use]
    fn digest(data: &[u8]) -> Self::Digest {
        Self::digest_with_seed(Self::Seed::default(), data)
    }

    /// Computes the digest of `data` with an explicit seed.
    #[must_use]
    fn digest_with_seed(seed: Self::Seed, data: &[u8]) -> Self::Digest {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}

/// Contract the delta engine relies on to disambiguate weak checksum hits.
///
/// Implementations must be deterministic and produce identical digests for a
/// byte range no matter how it is segmented in memory.
pub trait StrongHash: Send + Sync {
    /// Short lowercase name of the algorithm.
    fn name(&self) -> &'static str;

    /// Width of the produced digests in bytes.
    fn digest_len(&self) -> usize;

    /// Digests a byte range delivered as several segments.
    fn digest_vectored(&self, segments: &[IoSlice<'_>]) -> StrongSum;

    /// Digests a contiguous byte range.
    #[inline]
    fn digest(&self, data: &[u8]) -> StrongSum {
        self.digest_vectored(&[IoSlice::new(data)])
    }
}

impl<T: StrongHash + ?Sized> StrongHash for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn digest_len(&self) -> usize {
        (**self).digest_len()
    }

    fn digest_vectored(&self, segments: &[IoSlice<'_>]) -> StrongSum {
        (**self).digest_vectored(segments)
    }
}

/// Streams every segment through `hasher` and wraps the result.
fn streamed<D: StrongDigest>(mut hasher: D, segments: &[IoSlice<'_>]) -> StrongSum {
    for segment in segments {
        hasher.update(segment);
    }
    StrongSum::from(hasher.finalize().as_ref())
}

/// Strong hash selected at construction time.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StrongAlgorithm {
    /// MD4, upstream rsync's historical block checksum.
    Md4,
    /// MD5.
    Md5,
    /// SHA-1.
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// XXH64 with an explicit seed.
    Xxh64 {
        /// Seed applied to the XXH64 instance.
        seed: u64,
    },
    /// XXH3/64 with an explicit seed.
    Xxh3 {
        /// Seed applied to the XXH3 instance.
        seed: u64,
    },
}

impl StrongAlgorithm {
    /// Every selectable algorithm, unseeded variants using seed zero.
    pub const ALL: [Self; 7] = [
        Self::Md4,
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha384,
        Self::Xxh64 { seed: 0 },
        Self::Xxh3 { seed: 0 },
    ];
}

impl StrongHash for StrongAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            Self::Md4 => "md4",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Xxh64 { .. } => "xxh64",
            Self::Xxh3 { .. } => "xxh3",
        }
    }

    fn digest_len(&self) -> usize {
        match self {
            Self::Md4 => Md4::DIGEST_LEN,
            Self::Md5 => Md5::DIGEST_LEN,
            Self::Sha1 => Sha1::DIGEST_LEN,
            Self::Sha256 => Sha256::DIGEST_LEN,
            Self::Sha384 => Sha384::DIGEST_LEN,
            Self::Xxh64 { .. } => Xxh64::DIGEST_LEN,
            Self::Xxh3 { .. } => Xxh3::DIGEST_LEN,
        }
    }

    fn digest_vectored(&self, segments: &[IoSlice<'_>]) -> StrongSum {
        match *self {
            Self::Md4 => streamed(Md4::new(), segments),
            Self::Md5 => streamed(Md5::new(), segments),
            Self::Sha1 => streamed(Sha1::new(), segments),
            Self::Sha256 => streamed(Sha256::new(), segments),
            Self::Sha384 => streamed(Sha384::new(), segments),
            Self::Xxh64 { seed } => streamed(Xxh64::new(seed), segments),
            Self::Xxh3 { seed } => streamed(Xxh3::new(seed), segments),
        }
    }
}

impl fmt::Display for StrongAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrongAlgorithm {
    type Err = UnknownAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAlgorithmError::strong(s))
    }
}
