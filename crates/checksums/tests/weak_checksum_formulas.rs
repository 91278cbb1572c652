//! Closed-form checks for the weak rolling checksums.
//!
//! For a window `x[0..n]` both algorithms compute
//!
//! ```text
//! a = seed + sum(x[i])                      (mod 65536)
//! b = n * seed + sum((n - i) * x[i])        (mod 65536)
//! value = (b << 16) | a
//! ```
//!
//! with `seed = 1` for Adler-32 and `seed = 0` for upstream rsync's `rsum`.
//! Rotating removes `x[0]` and appends a new byte:
//!
//! ```text
//! a' = a - x[0] + new
//! b' = b - n * x[0] + a' - seed
//! ```

use std::io::IoSlice;

use checksums::{Adler32, RsyncRolling, WeakAlgorithm, WeakChecksum};

fn halves(value: u32) -> (u32, u32) {
    (value & 0xffff, value >> 16)
}

#[test]
fn two_bytes_match_formula() {
    let data = [0x12u8, 0x34];

    let (a, b) = halves(RsyncRolling.calculate(&data));
    assert_eq!(a, 0x46);
    assert_eq!(b, 0x12 + 0x46);

    let (a, b) = halves(Adler32.calculate(&data));
    assert_eq!(a, 1 + 0x46);
    assert_eq!(b, (1 + 0x12) + (1 + 0x46));
}

#[test]
fn components_are_truncated_to_16_bits() {
    let data = vec![0xffu8; 256];

    let (a, b) = halves(RsyncRolling.calculate(&data));
    assert_eq!(a, (256 * 255) % 65536);
    let expected_b: u64 = (1..=256u64).map(|n| n * 255).sum::<u64>() % 65536;
    assert_eq!(u64::from(b), expected_b);
}

#[test]
fn all_zero_block_only_carries_the_seed() {
    let data = vec![0u8; 1024];
    assert_eq!(RsyncRolling.calculate(&data), 0);
    // a stays 1, b accumulates 1 per byte.
    assert_eq!(Adler32.calculate(&data), (1024 << 16) | 1);
}

#[test]
fn rolling_update_matches_formula() {
    let data = b"ABCDEFGH";
    for weak in WeakAlgorithm::ALL {
        let rolled = weak.rotate(weak.calculate(&data[0..4]), 4, b'A', b'E');
        assert_eq!(rolled, weak.calculate(&data[1..5]), "{weak}");
    }
}

#[test]
fn sliding_window_full_scan() {
    let file_data =
        b"The quick brown fox jumps over the lazy dog. The quick brown fox jumps over the lazy dog.";

    for block_size in [1usize, 2, 7, 16, 64] {
        for weak in WeakAlgorithm::ALL {
            let mut rolling = weak.calculate(&file_data[..block_size]);
            for start in 1..=(file_data.len() - block_size) {
                rolling = weak.rotate(
                    rolling,
                    block_size,
                    file_data[start - 1],
                    file_data[start + block_size - 1],
                );
                assert_eq!(
                    rolling,
                    weak.calculate(&file_data[start..start + block_size]),
                    "{weak} mismatch at offset {start} with block size {block_size}"
                );
            }
        }
    }
}

#[test]
fn typical_block_sizes_produce_stable_values() {
    for block_size in [700usize, 2048, 8192] {
        let data: Vec<u8> = (0..block_size).map(|i| (i % 256) as u8).collect();
        for weak in WeakAlgorithm::ALL {
            assert_eq!(weak.calculate(&data), weak.calculate_vectored(&[IoSlice::new(&data)]));
            assert_ne!(weak.calculate(&data), 0);
        }
    }
}

#[test]
fn vectored_segments_match_contiguous_window() {
    let data: Vec<u8> = (0..300u32).map(|i| (i * 7 % 256) as u8).collect();
    let (left, rest) = data.split_at(1);
    let (middle, right) = rest.split_at(150);
    let segments = [IoSlice::new(left), IoSlice::new(&[]), IoSlice::new(middle), IoSlice::new(right)];

    for weak in WeakAlgorithm::ALL {
        assert_eq!(weak.calculate_vectored(&segments), weak.calculate(&data));
    }
}

#[test]
fn algorithms_disagree_on_identical_input() {
    let data = b"same bytes";
    assert_ne!(Adler32.calculate(data), RsyncRolling.calculate(data));
}

#[test]
fn trait_objects_dispatch() {
    let algorithms: [&dyn WeakChecksum; 2] = [&Adler32, &RsyncRolling];
    for weak in algorithms {
        let value = weak.calculate(b"abcd");
        assert_eq!(weak.rotate(value, 4, b'a', b'e'), weak.calculate(b"bcde"));
    }
}
