#![deny(unsafe_code)]

//! Rolling-checksum delta generation.
//!
//! This crate turns a target stream plus a [`signature::SignatureMap`] of a
//! base stream into a [`DeltaScript`]:
//! - [`DeltaScanner`] slides a block-sized window over the target, probing
//!   the map with a rotated weak checksum and confirming hits with the strong
//!   hash
//! - [`DeltaScript`] and [`DeltaOp`] describe the result as ordered copy and
//!   write operations that partition the target
//! - [`apply_delta`] rebuilds the target from the base and a script
//! - [`wire`] encodes scripts as compact binary records
//! - [`diff_signatures`] compares two built maps block by block
//!
//! # Design
//!
//! A match advances the window by a whole block and forces the next checksum
//! to be recalculated; a miss advances by one byte and rotates the checksum.
//! The scan only ever holds one read-ahead buffer of target data plus the
//! pending literal run, and the map is shared read-only through an
//! [`Arc`](std::sync::Arc), so any number of scans may run against one map.
//!
//! # See also
//!
//! - [`signature`] crate for map construction
//! - Upstream `match.c` for the rsync matcher this scan follows

mod block_index;
mod error;
mod scanner;
mod script;
pub mod wire;

pub use block_index::{BlockChange, diff_signatures};
pub use error::{DeltaError, ScriptError};
pub use scanner::{DeltaScanner, generate_delta};
pub use script::{DeltaOp, DeltaScript, apply_delta};

#[cfg(feature = "serde")]
mod literal_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
