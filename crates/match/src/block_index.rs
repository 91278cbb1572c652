//! crates/match/src/block_index.rs
//!
//! Block-aligned comparison of two signature maps.
//!
//! When both versions are already indexed, each target block can be looked
//! up in the base map directly. This finds blocks that moved to another
//! block-aligned position but, unlike the rolling scan, misses content that
//! shifted by anything other than a whole number of blocks.

use checksums::WeakChecksum;
use checksums::strong::StrongHash;
use signature::{BlockDescriptor, SignatureMap};
use tracing::debug;

use crate::error::DeltaError;

/// Outcome for one target block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "change", rename_all = "lowercase"))]
pub enum BlockChange {
    /// The target block exists in the base.
    Copy {
        /// Offset of the matching base block.
        source_offset: u64,
        /// Block length.
        length: u32,
        /// Offset of the block in the target.
        target_offset: u64,
    },
    /// The target block has no counterpart; its bytes must come from the target.
    Missing {
        /// Offset of the block in the target.
        target_offset: u64,
        /// Block length.
        length: u32,
    },
}

impl BlockChange {
    /// Returns the target offset of the block.
    #[must_use]
    pub const fn target_offset(&self) -> u64 {
        match self {
            Self::Copy { target_offset, .. } | Self::Missing { target_offset, .. } => {
                *target_offset
            }
        }
    }

    /// Returns the block length.
    #[must_use]
    pub const fn length(&self) -> u32 {
        match self {
            Self::Copy { length, .. } | Self::Missing { length, .. } => *length,
        }
    }
}

/// Compares every block of `target` against `base`, in target order.
///
/// Both maps must use the same block size and strong hash; with different
/// strong hashes no block will match.
pub fn diff_signatures<W, S>(
    base: &SignatureMap<W, S>,
    target: &SignatureMap<W, S>,
) -> Result<Vec<BlockChange>, DeltaError>
where
    W: WeakChecksum,
    S: StrongHash,
{
    if base.block_size() != target.block_size() {
        return Err(DeltaError::BlockSizeMismatch {
            base: base.block_size(),
            target: target.block_size(),
        });
    }

    let changes: Vec<BlockChange> = target
        .blocks()
        .iter()
        .map(|block| match find_in_base(base, block) {
            Some(source) => BlockChange::Copy {
                source_offset: source.offset(),
                length: block.length(),
                target_offset: block.offset(),
            },
            None => BlockChange::Missing {
                target_offset: block.offset(),
                length: block.length(),
            },
        })
        .collect();

    debug!(
        blocks = changes.len(),
        missing = changes
            .iter()
            .filter(|change| matches!(change, BlockChange::Missing { .. }))
            .count(),
        "block-index diff finished"
    );
    Ok(changes)
}

fn find_in_base<'a, W, S>(
    base: &'a SignatureMap<W, S>,
    block: &BlockDescriptor,
) -> Option<&'a BlockDescriptor> {
    let length = block.length() as usize;
    base.find_by_strong(block.strong())
        .filter(|candidate| candidate.matches(length, block.strong()))
        .or_else(|| {
            base.lookup(block.weak())
                .find(|candidate| candidate.matches(length, block.strong()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use signature::build_signature_map;

    #[test]
    fn moved_blocks_are_copies() {
        let base = build_signature_map(&b"AAAABBBBCCCC"[..], 4, 8).expect("base");
        let target = build_signature_map(&b"CCCCAAAAXXXXBB"[..], 4, 8).expect("target");
        let changes = diff_signatures(&base, &target).expect("diff");
        assert_eq!(
            changes,
            [
                BlockChange::Copy {
                    source_offset: 8,
                    length: 4,
                    target_offset: 0
                },
                BlockChange::Copy {
                    source_offset: 0,
                    length: 4,
                    target_offset: 4
                },
                BlockChange::Missing {
                    target_offset: 8,
                    length: 4
                },
                BlockChange::Missing {
                    target_offset: 12,
                    length: 2
                },
            ]
        );
    }

    #[test]
    fn block_sizes_must_agree() {
        let base = build_signature_map(&b"abcdef"[..], 2, 4).expect("base");
        let target = build_signature_map(&b"abcdef"[..], 3, 4).expect("target");
        assert!(matches!(
            diff_signatures(&base, &target),
            Err(DeltaError::BlockSizeMismatch { base: 2, target: 3 })
        ));
    }

    #[test]
    fn shifted_content_is_not_detected() {
        let base = build_signature_map(&b"0123456789ab"[..], 4, 8).expect("base");
        let target = build_signature_map(&b"-0123456789ab"[..], 4, 8).expect("target");
        let changes = diff_signatures(&base, &target).expect("diff");
        assert!(
            changes
                .iter()
                .all(|change| matches!(change, BlockChange::Missing { .. }))
        );
        let covered: u64 = changes.iter().map(|c| u64::from(c.length())).sum();
        assert_eq!(covered, 13);
    }

    #[test]
    fn empty_target_has_no_changes() {
        let base = build_signature_map(&b"abcd"[..], 2, 4).expect("base");
        let target = build_signature_map(&b""[..], 2, 4).expect("target");
        assert!(diff_signatures(&base, &target).expect("diff").is_empty());
    }
}
