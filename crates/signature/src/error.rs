//! crates/signature/src/error.rs
//!
//! Errors raised while building a signature map.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::stream::StreamStateError;

/// Errors produced while building or assembling a [`SignatureMap`](crate::SignatureMap).
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The block or buffer size was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The base stream could not be opened for reading.
    #[error(transparent)]
    StreamState(#[from] StreamStateError),
    /// Reading the base stream failed.
    #[error("failed to read base stream while building signature map: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// The build was cancelled before the base stream was exhausted.
    #[error("signature map build cancelled after {bytes} byte(s)")]
    Cancelled {
        /// Base bytes hashed before cancellation was observed.
        bytes: u64,
    },
    /// A block does not start where the previous one ended.
    #[error("block {index} starts at offset {offset}, expected {expected}")]
    NonContiguousBlock {
        /// Position of the offending block.
        index: u64,
        /// Offset recorded in the block.
        offset: u64,
        /// Offset implied by the preceding blocks.
        expected: u64,
    },
    /// A block has the wrong length for its position.
    #[error("block {index} is {length} byte(s) long; block size is {block_size}")]
    BlockLength {
        /// Position of the offending block.
        index: u64,
        /// Length recorded in the block.
        length: u32,
        /// Block size of the map.
        block_size: u32,
    },
}
