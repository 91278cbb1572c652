//! SHA family hashers backed by the RustCrypto `sha1` and `sha2` crates.

use std::fmt;

use digest::Digest;

use super::StrongDigest;

macro_rules! sha_hasher {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $len:literal) => {
        $(#[$meta])*
        #[derive(Clone, Default)]
        pub struct $name {
            inner: $inner,
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }

        impl $name {
            /// Creates a hasher with an empty state.
            #[must_use]
            pub fn new() -> Self {
                Self {
                    inner: <$inner>::new(),
                }
            }

            /// Feeds additional bytes into the digest state.
            pub fn update(&mut self, data: &[u8]) {
                self.inner.update(data);
            }

            /// Finalises the digest.
            #[must_use]
            pub fn finalize(self) -> [u8; $len] {
                let mut output = [0u8; $len];
                output.copy_from_slice(&self.inner.finalize());
                output
            }

            /// Convenience helper that computes the digest for `data` in one shot.
            #[must_use]
            pub fn digest(data: &[u8]) -> [u8; $len] {
                <Self as StrongDigest>::digest(data)
            }
        }

        impl StrongDigest for $name {
            type Seed = ();
            type Digest = [u8; $len];
            const DIGEST_LEN: usize = $len;

            fn with_seed((): Self::Seed) -> Self {
                Self::new()
            }

            fn update(&mut self, data: &[u8]) {
                self.update(data);
            }

            fn finalize(self) -> Self::Digest {
                self.finalize()
            }
        }
    };
}

sha_hasher!(
    /// Streaming SHA-1 hasher.
    Sha1,
    sha1::Sha1,
    20
);

sha_hasher!(
    /// Streaming SHA-256 hasher.
    Sha256,
    sha2::Sha256,
    32
);

sha_hasher!(
    /// Streaming SHA-384 hasher.
    Sha384,
    sha2::Sha384,
    48
);
