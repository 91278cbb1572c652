use std::io::IoSlice;

use super::WeakChecksum;

/// Adler-32 style weak checksum with the byte sum seeded at 1.
///
/// Unlike zlib's Adler-32 both halves are reduced modulo 65536 rather than
/// the prime 65521, which keeps [`rotate`](WeakChecksum::rotate) a handful of
/// wrapping operations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Adler32;

impl Adler32 {
    const SEED: u32 = 1;
}

impl WeakChecksum for Adler32 {
    fn name(&self) -> &'static str {
        "adler32"
    }

    #[inline]
    fn calculate_vectored(&self, segments: &[IoSlice<'_>]) -> u32 {
        let (s1, s2) = accumulate_segments(Self::SEED, segments);
        pack(s1, s2)
    }

    #[inline]
    fn rotate(&self, previous: u32, window_len: usize, removed: u8, added: u8) -> u32 {
        let (s1, s2) = unpack(previous);
        let removed = u32::from(removed);
        let added = u32::from(added);

        let s1 = s1.wrapping_sub(removed).wrapping_add(added) & 0xffff;
        let s2 = s2
            .wrapping_sub(window_len_mod(window_len).wrapping_mul(removed))
            .wrapping_add(s1)
            .wrapping_sub(Self::SEED)
            & 0xffff;
        pack(s1, s2)
    }
}

/// Rolling checksum used by upstream rsync for weak block matching (`rsum`).
///
/// `s1` accumulates the byte sum, `s2` the prefix sums, both truncated to 16
/// bits. There is no seed, so rotating does not need a correction term.
#[doc(alias = "rsum")]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RsyncRolling;

impl WeakChecksum for RsyncRolling {
    fn name(&self) -> &'static str {
        "rsync"
    }

    #[inline]
    fn calculate_vectored(&self, segments: &[IoSlice<'_>]) -> u32 {
        let (s1, s2) = accumulate_segments(0, segments);
        pack(s1, s2)
    }

    #[inline]
    fn rotate(&self, previous: u32, window_len: usize, removed: u8, added: u8) -> u32 {
        let (s1, s2) = unpack(previous);
        let removed = u32::from(removed);
        let added = u32::from(added);

        let s1 = s1.wrapping_sub(removed).wrapping_add(added) & 0xffff;
        let s2 = s2
            .wrapping_sub(window_len_mod(window_len).wrapping_mul(removed))
            .wrapping_add(s1)
            & 0xffff;
        pack(s1, s2)
    }
}

#[inline]
const fn pack(s1: u32, s2: u32) -> u32 {
    ((s2 & 0xffff) << 16) | (s1 & 0xffff)
}

#[inline]
const fn unpack(value: u32) -> (u32, u32) {
    (value & 0xffff, value >> 16)
}

/// Window length reduced to the checksum modulus; only the low 16 bits matter.
#[inline]
const fn window_len_mod(window_len: usize) -> u32 {
    (window_len & 0xffff) as u32
}

#[inline]
fn accumulate_segments(seed: u32, segments: &[IoSlice<'_>]) -> (u32, u32) {
    segments
        .iter()
        .fold((seed, 0), |(s1, s2), segment| accumulate_chunk(s1, s2, segment))
}

/// Adds `chunk` to the running sums.
///
/// The sums are allowed to wrap at 32 bits: 65536 divides 2^32, so masking at
/// the end yields the same halves as reducing after every byte.
#[inline]
fn accumulate_chunk(mut s1: u32, mut s2: u32, chunk: &[u8]) -> (u32, u32) {
    let mut iter = chunk.chunks_exact(4);
    for block in &mut iter {
        s1 = s1.wrapping_add(u32::from(block[0]));
        s2 = s2.wrapping_add(s1);

        s1 = s1.wrapping_add(u32::from(block[1]));
        s2 = s2.wrapping_add(s1);

        s1 = s1.wrapping_add(u32::from(block[2]));
        s2 = s2.wrapping_add(s1);

        s1 = s1.wrapping_add(u32::from(block[3]));
        s2 = s2.wrapping_add(s1);
    }

    for &byte in iter.remainder() {
        s1 = s1.wrapping_add(u32::from(byte));
        s2 = s2.wrapping_add(s1);
    }

    (s1, s2)
}
