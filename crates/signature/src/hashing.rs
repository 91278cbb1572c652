//! crates/signature/src/hashing.rs
//!
//! Per-block weak and strong checksum computation over a filled buffer.
//!
//! With the `parallel` feature the blocks of one buffer are hashed with
//! rayon. Results are collected in block order either way, so the resulting
//! map is identical to the sequential build.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use checksums::WeakChecksum;
use checksums::strong::StrongHash;

use crate::block::BlockDescriptor;

/// Hashes consecutive `block_size` chunks of `region`.
///
/// Only the final chunk may be shorter than `block_size`. `first_index` and
/// `first_offset` locate the first chunk within the base stream.
pub(crate) fn hash_blocks<W, S>(
    region: &[u8],
    block_size: usize,
    first_index: u64,
    first_offset: u64,
    weak: &W,
    strong: &S,
) -> Vec<BlockDescriptor>
where
    W: WeakChecksum,
    S: StrongHash,
{
    let describe = |(position, chunk): (usize, &[u8])| {
        BlockDescriptor::new(
            first_index + position as u64,
            first_offset + (position * block_size) as u64,
            chunk.len() as u32,
            weak.calculate(chunk),
            strong.digest(chunk),
        )
    };

    #[cfg(feature = "parallel")]
    {
        region
            .par_chunks(block_size)
            .enumerate()
            .map(describe)
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        region.chunks(block_size).enumerate().map(describe).collect()
    }
}
