#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Signature maps over a base stream.
//!
//! # Overview
//!
//! A [`SignatureMap`] divides a base stream into fixed-size blocks and
//! records a weak rolling checksum and a strong hash for each one. The delta
//! scanner in the `matching` crate probes the map with the weak checksum of
//! every target window and confirms hits with the strong hash.
//!
//! - [`SignatureConfig`] validates block and buffer sizes.
//! - [`SignatureMapBuilder`] reads the base stream once through a bounded
//!   [`ChunkCursor`] and freezes the result.
//! - [`SignatureMap`] answers weak lookups, strong lookups and confirmed
//!   matches.
//!
//! # Invariants
//!
//! - Blocks are contiguous from offset 0; only the last may be short.
//! - Every block is reachable from both indices.
//! - Blocks sharing a weak checksum are all retained, in offset order.
//!
//! # Examples
//!
//! ```
//! use signature::build_signature_map;
//! use checksums::{WeakAlgorithm, WeakChecksum};
//!
//! let map = build_signature_map(&b"hello, world"[..], 4, 16).expect("build");
//! let weak = WeakAlgorithm::Adler32.calculate(b"o, w");
//! let block = map.find_match(weak, b"o, w").expect("second block");
//! assert_eq!(block.offset(), 4);
//! ```

mod block;
mod builder;
mod config;
mod error;
mod hashing;
mod map;
mod stream;

pub use block::BlockDescriptor;
pub use builder::{SignatureMapBuilder, build_signature_map};
pub use config::{
    ConfigError, DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_SIZE, SignatureConfig, SignatureConfigBuilder,
    suggest_block_size, validate_sizes,
};
pub use error::SignatureError;
pub use map::SignatureMap;
pub use stream::{ChunkCursor, StreamStateError, open_readable};
