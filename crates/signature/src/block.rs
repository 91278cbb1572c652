//! crates/signature/src/block.rs
//!
//! Individual block descriptor within a signature map.

use checksums::strong::StrongSum;

/// Describes one block of the base stream.
///
/// Blocks partition the base stream: block `i` starts at `i * block_size`
/// and every block except the last is exactly `block_size` bytes long.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockDescriptor {
    index: u64,
    offset: u64,
    length: u32,
    weak: u32,
    strong: StrongSum,
}

impl BlockDescriptor {
    /// Creates a block descriptor from its components.
    #[must_use]
    pub const fn new(index: u64, offset: u64, length: u32, weak: u32, strong: StrongSum) -> Self {
        Self {
            index,
            offset,
            length,
            weak,
            strong,
        }
    }

    /// Returns the zero-based index of the block.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Returns the byte offset of the block within the base stream.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the number of bytes covered by the block.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Returns the offset one past the last byte of the block.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.length as u64
    }

    /// Returns the weak checksum of the block.
    #[inline]
    #[must_use]
    pub const fn weak(&self) -> u32 {
        self.weak
    }

    /// Returns the strong hash of the block.
    #[inline]
    #[must_use]
    pub const fn strong(&self) -> &StrongSum {
        &self.strong
    }

    /// Reports whether `window` is this block: same length and same strong hash.
    #[inline]
    #[must_use]
    pub fn matches(&self, window_len: usize, strong: &StrongSum) -> bool {
        self.length as usize == window_len && self.strong == *strong
    }
}
