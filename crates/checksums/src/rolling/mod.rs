//! Weak rolling checksums used to find candidate blocks.
//!
//! A weak checksum is cheap to compute and can be slid across a buffer one
//! byte at a time in O(1). Matches found through it are only candidates: the
//! caller confirms each one with a [`StrongHash`](crate::strong::StrongHash).
//!
//! # Algorithm
//!
//! Both implementations keep two 16-bit halves packed as `(b << 16) | a`,
//! where `a` is the running byte sum and `b` the running sum of the partial
//! sums. They differ only in the seed of `a`:
//!
//! - [`Adler32`] seeds `a` with 1, so a rotation has to subtract the seed
//!   back out of `b`.
//! - [`RsyncRolling`] seeds `a` with 0, matching upstream rsync's `rsum`.
//!
//! # Example
//!
//! ```rust
//! use checksums::{Adler32, WeakChecksum};
//!
//! let data = b"ABCDE";
//! let weak = Adler32;
//!
//! let first = weak.calculate(&data[0..3]);
//! let rotated = weak.rotate(first, 3, data[0], data[3]);
//! assert_eq!(rotated, weak.calculate(&data[1..4]));
//! ```

use std::fmt;
use std::io::IoSlice;
use std::str::FromStr;

mod checksum;

pub use checksum::{Adler32, RsyncRolling};

use crate::error::UnknownAlgorithmError;

/// Contract shared by every weak checksum algorithm.
///
/// `calculate` must produce the same value however the window is segmented,
/// and `rotate` must agree with `calculate` over the window shifted forward by
/// exactly one byte. `rotate` is only valid when the window length is
/// unchanged; windows of a different length are always recomputed.
pub trait WeakChecksum: Send + Sync {
    /// Short lowercase name of the algorithm.
    fn name(&self) -> &'static str;

    /// Computes the checksum of a window delivered as several segments.
    fn calculate_vectored(&self, segments: &[IoSlice<'_>]) -> u32;

    /// Computes the checksum of a contiguous window.
    #[inline]
    fn calculate(&self, window: &[u8]) -> u32 {
        self.calculate_vectored(&[IoSlice::new(window)])
    }

    /// Slides a window of `window_len` bytes forward by one byte.
    ///
    /// `previous` is the checksum of the old window, `removed` its first byte
    /// and `added` the byte that now ends the window.
    fn rotate(&self, previous: u32, window_len: usize, removed: u8, added: u8) -> u32;
}

impl<T: WeakChecksum + ?Sized> WeakChecksum for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn calculate_vectored(&self, segments: &[IoSlice<'_>]) -> u32 {
        (**self).calculate_vectored(segments)
    }

    fn rotate(&self, previous: u32, window_len: usize, removed: u8, added: u8) -> u32 {
        (**self).rotate(previous, window_len, removed, added)
    }
}

/// Weak checksum selected at construction time.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WeakAlgorithm {
    /// Adler-32 style sums with `a` seeded at 1.
    #[default]
    Adler32,
    /// Upstream rsync's rolling sum with `a` seeded at 0.
    Rsync,
}

impl WeakAlgorithm {
    /// Every selectable algorithm, in presentation order.
    pub const ALL: [Self; 2] = [Self::Adler32, Self::Rsync];
}

impl WeakChecksum for WeakAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            Self::Adler32 => Adler32.name(),
            Self::Rsync => RsyncRolling.name(),
        }
    }

    #[inline]
    fn calculate_vectored(&self, segments: &[IoSlice<'_>]) -> u32 {
        match self {
            Self::Adler32 => Adler32.calculate_vectored(segments),
            Self::Rsync => RsyncRolling.calculate_vectored(segments),
        }
    }

    #[inline]
    fn rotate(&self, previous: u32, window_len: usize, removed: u8, added: u8) -> u32 {
        match self {
            Self::Adler32 => Adler32.rotate(previous, window_len, removed, added),
            Self::Rsync => RsyncRolling.rotate(previous, window_len, removed, added),
        }
    }
}

impl fmt::Display for WeakAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeakAlgorithm {
    type Err = UnknownAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAlgorithmError::weak(s))
    }
}
