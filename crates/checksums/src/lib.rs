#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Checksum algorithms for binary delta generation.
//!
//! # Overview
//!
//! Delta generation needs two kinds of checksum. A *weak* checksum is cheap
//! and can be rotated one byte at a time, so every offset of a target stream
//! can be probed against the blocks of a base stream. A *strong* hash is
//! expensive but collision resistant, and is only computed to confirm a weak
//! match before a block is reused.
//!
//! - [`WeakChecksum`] with [`Adler32`], [`RsyncRolling`] and the
//!   [`WeakAlgorithm`] selector.
//! - [`strong::StrongHash`] with the [`strong::StrongAlgorithm`] selector and
//!   the streaming hashers in [`strong`].
//!
//! # Invariants
//!
//! - Both contracts are pure functions of the bytes they see; segmentation of
//!   the input never changes the result.
//! - Rotating a weak checksum by one byte always equals recomputing it over
//!   the shifted window of the same length.
//!
//! # Examples
//!
//! ```
//! use checksums::strong::{StrongAlgorithm, StrongHash};
//! use checksums::{WeakAlgorithm, WeakChecksum};
//!
//! let block = b"some block of data";
//! let weak = WeakAlgorithm::Adler32.calculate(block);
//! let strong = StrongAlgorithm::Sha1.digest(block);
//!
//! assert_eq!(weak, WeakAlgorithm::Adler32.calculate(block));
//! assert_eq!(strong.len(), 20);
//! ```

mod error;
mod rolling;
pub mod strong;

pub use error::UnknownAlgorithmError;
pub use rolling::{Adler32, RsyncRolling, WeakAlgorithm, WeakChecksum};
