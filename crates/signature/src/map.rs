//! crates/signature/src/map.rs
//!
//! Frozen, weak-checksum-indexed collection of base blocks.

use std::fmt;

use rustc_hash::FxHashMap;

use checksums::strong::{StrongAlgorithm, StrongHash, StrongSum};
use checksums::{WeakAlgorithm, WeakChecksum};

use crate::block::BlockDescriptor;
use crate::config::SignatureConfig;
use crate::error::SignatureError;

/// Signature of a base stream: every block plus two lookup indices.
///
/// Blocks live in a single arena in offset order. The weak index maps a weak
/// checksum to the arena positions of every block carrying it, in insertion
/// order, so colliding blocks are all retained. The strong index maps a
/// strong hash to the first block that produced it. Both indices are
/// populated together for every block.
///
/// A built map is never mutated, so it can be shared across threads behind
/// an [`Arc`](std::sync::Arc).
pub struct SignatureMap<W = WeakAlgorithm, S = StrongAlgorithm> {
    config: SignatureConfig,
    weak: W,
    strong: S,
    blocks: Vec<BlockDescriptor>,
    by_weak: FxHashMap<u32, Vec<usize>>,
    by_strong: FxHashMap<StrongSum, usize>,
    base_len: u64,
}

impl<W, S> SignatureMap<W, S> {
    pub(crate) fn empty(config: SignatureConfig, weak: W, strong: S) -> Self {
        Self {
            config,
            weak,
            strong,
            blocks: Vec::new(),
            by_weak: FxHashMap::default(),
            by_strong: FxHashMap::default(),
            base_len: 0,
        }
    }

    /// Appends a block and indexes it under both checksums.
    pub(crate) fn push(&mut self, block: BlockDescriptor) {
        let slot = self.blocks.len();
        self.by_weak.entry(block.weak()).or_default().push(slot);
        self.by_strong.entry(block.strong().clone()).or_insert(slot);
        self.base_len = block.end();
        self.blocks.push(block);
    }

    /// Returns the sizing the map was built with.
    #[must_use]
    pub const fn config(&self) -> SignatureConfig {
        self.config
    }

    /// Returns the block size.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.config.block_size()
    }

    /// Returns the weak checksum algorithm.
    #[must_use]
    pub const fn weak_algorithm(&self) -> &W {
        &self.weak
    }

    /// Returns the strong hash algorithm.
    #[must_use]
    pub const fn strong_algorithm(&self) -> &S {
        &self.strong
    }

    /// Returns every block in offset order.
    #[must_use]
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }

    /// Returns the block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> Option<&BlockDescriptor> {
        self.blocks.get(index)
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Reports whether the base stream was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the length of the base stream.
    #[must_use]
    pub const fn base_len(&self) -> u64 {
        self.base_len
    }

    /// Returns the number of distinct weak checksums.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.by_weak.len()
    }

    /// Returns the number of blocks that share a weak checksum with an
    /// earlier block.
    #[must_use]
    pub fn collision_count(&self) -> usize {
        self.blocks.len() - self.by_weak.len()
    }

    /// Returns every block whose weak checksum equals `weak`, in offset order.
    pub fn lookup(&self, weak: u32) -> impl ExactSizeIterator<Item = &BlockDescriptor> + '_ {
        self.by_weak
            .get(&weak)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|&slot| &self.blocks[slot])
    }

    /// Reports whether any block carries the weak checksum `weak`.
    #[must_use]
    pub fn contains_weak(&self, weak: u32) -> bool {
        self.by_weak.contains_key(&weak)
    }

    /// Returns the first block whose strong hash equals `strong`.
    #[must_use]
    pub fn find_by_strong(&self, strong: &StrongSum) -> Option<&BlockDescriptor> {
        self.by_strong.get(strong).map(|&slot| &self.blocks[slot])
    }
}

impl<W: WeakChecksum, S: StrongHash> SignatureMap<W, S> {
    /// Confirms a weak hit on `window`.
    ///
    /// Returns the first block in the weak bucket with the same length and
    /// strong hash as `window`. The strong hash is computed at most once and
    /// only when the bucket is non-empty.
    #[must_use]
    pub fn find_match(&self, weak: u32, window: &[u8]) -> Option<&BlockDescriptor> {
        let slots = self.by_weak.get(&weak)?;
        if !slots
            .iter()
            .any(|&slot| self.blocks[slot].length() as usize == window.len())
        {
            return None;
        }
        let strong = self.strong.digest(window);
        slots
            .iter()
            .map(|&slot| &self.blocks[slot])
            .find(|block| block.matches(window.len(), &strong))
    }

    /// Reassembles a map from previously computed blocks.
    ///
    /// The blocks must partition a stream: contiguous offsets starting at 0,
    /// and every block but the last exactly `config.block_size()` bytes.
    /// Indices are taken from the block order.
    pub fn from_blocks(
        config: SignatureConfig,
        weak: W,
        strong: S,
        blocks: impl IntoIterator<Item = BlockDescriptor>,
    ) -> Result<Self, SignatureError> {
        let mut map = Self::empty(config, weak, strong);
        let mut short_seen: Option<u64> = None;
        for (index, block) in blocks.into_iter().enumerate() {
            let index = index as u64;
            if let Some(short) = short_seen {
                return Err(SignatureError::BlockLength {
                    index: short,
                    length: map.blocks[short as usize].length(),
                    block_size: config.block_len(),
                });
            }
            if block.offset() != map.base_len {
                return Err(SignatureError::NonContiguousBlock {
                    index,
                    offset: block.offset(),
                    expected: map.base_len,
                });
            }
            if block.length() == 0 || block.length() > config.block_len() {
                return Err(SignatureError::BlockLength {
                    index,
                    length: block.length(),
                    block_size: config.block_len(),
                });
            }
            if block.length() < config.block_len() {
                short_seen = Some(index);
            }
            map.push(BlockDescriptor::new(
                index,
                block.offset(),
                block.length(),
                block.weak(),
                block.strong().clone(),
            ));
        }
        Ok(map)
    }
}

impl<W: fmt::Debug, S: fmt::Debug> fmt::Debug for SignatureMap<W, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureMap")
            .field("config", &self.config)
            .field("weak", &self.weak)
            .field("strong", &self.strong)
            .field("blocks", &self.blocks.len())
            .field("buckets", &self.by_weak.len())
            .field("base_len", &self.base_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(block_size: usize) -> SignatureConfig {
        SignatureConfig::new(block_size, block_size * 4).expect("config")
    }

    fn block(index: u64, offset: u64, length: u32, weak: u32, tag: u8) -> BlockDescriptor {
        BlockDescriptor::new(index, offset, length, weak, StrongSum::from(vec![tag; 4]))
    }

    #[test]
    fn push_populates_both_indices() {
        let mut map = SignatureMap::empty(config(4), WeakAlgorithm::Adler32, StrongAlgorithm::Sha1);
        map.push(block(0, 0, 4, 7, 1));
        map.push(block(1, 4, 4, 7, 2));
        map.push(block(2, 8, 2, 9, 1));

        assert_eq!(map.block_count(), 3);
        assert_eq!(map.base_len(), 10);
        assert_eq!(map.bucket_count(), 2);
        assert_eq!(map.collision_count(), 1);

        let bucket: Vec<_> = map.lookup(7).map(BlockDescriptor::index).collect();
        assert_eq!(bucket, [0, 1]);
        assert_eq!(map.lookup(9).len(), 1);
        assert_eq!(map.lookup(8).len(), 0);
        assert!(map.contains_weak(9));
        assert!(!map.contains_weak(8));

        let first = map
            .find_by_strong(&StrongSum::from(vec![1u8; 4]))
            .expect("strong hit");
        assert_eq!(first.index(), 0);
    }

    #[test]
    fn find_match_checks_length_and_strong_hash() {
        let weak = WeakAlgorithm::Adler32;
        let strong = StrongAlgorithm::Md5;
        let mut map = SignatureMap::empty(config(3), weak, strong);
        for (index, chunk) in b"abcdefgh".chunks(3).enumerate() {
            map.push(BlockDescriptor::new(
                index as u64,
                (index * 3) as u64,
                chunk.len() as u32,
                weak.calculate(chunk),
                strong.digest(chunk),
            ));
        }

        let hit = map
            .find_match(weak.calculate(b"def"), b"def")
            .expect("def is block 1");
        assert_eq!(hit.offset(), 3);

        let tail = map.find_match(weak.calculate(b"gh"), b"gh").expect("tail block");
        assert_eq!(tail.length(), 2);

        assert!(map.find_match(weak.calculate(b"xyz"), b"xyz").is_none());
        // Weak hit with a different window is rejected by the strong hash.
        assert!(map.find_match(weak.calculate(b"abc"), b"abd").is_none());
    }

    #[test]
    fn colliding_blocks_are_all_retained() {
        let mut map = SignatureMap::empty(config(2), WeakAlgorithm::Adler32, StrongAlgorithm::Sha1);
        map.push(block(0, 0, 2, 42, 1));
        map.push(block(1, 2, 2, 42, 2));
        map.push(block(2, 4, 2, 42, 3));
        assert_eq!(map.lookup(42).len(), 3);
        assert_eq!(map.collision_count(), 2);
    }

    #[test]
    fn from_blocks_validates_partition() {
        let ok = SignatureMap::from_blocks(
            config(4),
            WeakAlgorithm::Adler32,
            StrongAlgorithm::Sha1,
            [block(9, 0, 4, 1, 1), block(9, 4, 1, 2, 2)],
        )
        .expect("valid partition");
        assert_eq!(ok.blocks()[1].index(), 1);
        assert_eq!(ok.base_len(), 5);

        let gap = SignatureMap::from_blocks(
            config(4),
            WeakAlgorithm::Adler32,
            StrongAlgorithm::Sha1,
            [block(0, 0, 4, 1, 1), block(1, 5, 4, 2, 2)],
        )
        .unwrap_err();
        assert!(matches!(
            gap,
            SignatureError::NonContiguousBlock {
                index: 1,
                offset: 5,
                expected: 4
            }
        ));

        let short_middle = SignatureMap::from_blocks(
            config(4),
            WeakAlgorithm::Adler32,
            StrongAlgorithm::Sha1,
            [block(0, 0, 2, 1, 1), block(1, 2, 4, 2, 2)],
        )
        .unwrap_err();
        assert!(matches!(
            short_middle,
            SignatureError::BlockLength { index: 0, length: 2, .. }
        ));

        let oversized = SignatureMap::from_blocks(
            config(4),
            WeakAlgorithm::Adler32,
            StrongAlgorithm::Sha1,
            [block(0, 0, 5, 1, 1)],
        )
        .unwrap_err();
        assert!(matches!(oversized, SignatureError::BlockLength { index: 0, length: 5, .. }));
    }

    #[test]
    fn empty_map_reports_nothing() {
        let map: SignatureMap = SignatureMap::empty(
            SignatureConfig::default(),
            WeakAlgorithm::default(),
            StrongAlgorithm::default(),
        );
        assert!(map.is_empty());
        assert_eq!(map.base_len(), 0);
        assert_eq!(map.collision_count(), 0);
        assert!(map.find_match(1, b"x").is_none());
    }
}
