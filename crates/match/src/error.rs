//! crates/match/src/error.rs
//!
//! Errors raised while scanning, decoding or checking delta scripts.

use std::io;

use signature::{ConfigError, StreamStateError};
use thiserror::Error;

/// Errors produced by [`DeltaScanner`](crate::DeltaScanner) and block-index diffs.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// The buffer size was invalid for the map's block size.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The target stream could not be opened for reading.
    #[error(transparent)]
    StreamState(#[from] StreamStateError),
    /// No signature map has been attached to the scanner.
    #[error("delta scan requires a signature map, but none has been built")]
    PrecursorMissing,
    /// Reading the target stream failed.
    #[error("failed to read target stream while scanning: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// The scan was cancelled before the target stream was exhausted.
    #[error("delta scan cancelled at target offset {offset}")]
    Cancelled {
        /// Target offset reached when cancellation was observed.
        offset: u64,
    },
    /// A delta script was malformed.
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// Two signature maps with different block sizes were compared.
    #[error("base map uses {base}-byte blocks but target map uses {target}-byte blocks")]
    BlockSizeMismatch {
        /// Block size of the base map.
        base: usize,
        /// Block size of the target map.
        target: usize,
    },
}

/// A delta script that violates the partition invariant or cannot be decoded.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// An operation does not start where the previous one ended.
    #[error("operation {index} starts at target offset {offset}, expected {expected}")]
    Discontiguous {
        /// Position of the offending operation.
        index: usize,
        /// Target offset recorded in the operation.
        offset: u64,
        /// Offset implied by the preceding operations.
        expected: u64,
    },
    /// An operation covers no bytes.
    #[error("operation {index} has zero length")]
    EmptyOperation {
        /// Position of the offending operation.
        index: usize,
    },
    /// A write declares a length different from its literal payload.
    #[error("write {index} declares {length} byte(s) but carries {actual}")]
    LiteralLength {
        /// Position of the offending operation.
        index: usize,
        /// Declared length.
        length: u32,
        /// Literal payload length.
        actual: usize,
    },
    /// A literal run does not fit in a single write.
    #[error("literal of {length} bytes exceeds the 32-bit write length")]
    LiteralTooLong {
        /// Length of the literal.
        length: usize,
    },
    /// The stream does not begin with the delta header.
    #[error("delta stream does not start with the BDLT header")]
    BadMagic,
    /// The header names a format version this build cannot read.
    #[error("unsupported delta stream version {0}")]
    UnsupportedVersion(u8),
    /// A record starts with an unknown tag byte.
    #[error("unknown delta record tag {tag:#04x} at byte {offset}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Stream offset of the tag byte.
        offset: u64,
    },
    /// The stream ended inside the header or a record.
    #[error("delta stream is truncated")]
    Truncated,
    /// Bytes follow the end-of-script record.
    #[error("delta stream has trailing data after the end record")]
    TrailingData,
    /// Reading the encoded stream failed.
    #[error("failed to read delta stream: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for ScriptError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(error)
        }
    }
}
