use std::fmt;
use std::ops::Deref;

/// Owned strong digest of one block or window.
///
/// Equality, ordering and hashing are byte-exact over the digest bytes. With
/// the `serde` feature the sum serialises as a standard base64 string.
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StrongSum(Box<[u8]>);

impl StrongSum {
    /// Returns the digest bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the digest width in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reports whether the digest has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the digest as lowercase hexadecimal.
    #[must_use]
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl From<&[u8]> for StrongSum {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<Vec<u8>> for StrongSum {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl Deref for StrongSum {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for StrongSum {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8]> for StrongSum {
    fn eq(&self, other: &[u8]) -> bool {
        *self.0 == *other
    }
}

impl fmt::Debug for StrongSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrongSum").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for StrongSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(feature = "serde")]
mod serde_impl {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    use super::StrongSum;

    impl Serialize for StrongSum {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&STANDARD.encode(&self.0))
        }
    }

    struct Base64Visitor;

    impl Visitor<'_> for Base64Visitor {
        type Value = StrongSum;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a base64 encoded strong checksum")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            STANDARD
                .decode(value)
                .map(StrongSum::from)
                .map_err(|error| E::custom(format!("invalid base64 strong checksum: {error}")))
        }
    }

    impl<'de> Deserialize<'de> for StrongSum {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_str(Base64Visitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_byte_exact() {
        let a = StrongSum::from(vec![1, 2, 3]);
        let b = StrongSum::from(&[1u8, 2, 3][..]);
        let c = StrongSum::from(vec![1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a == *[1u8, 2, 3].as_slice());
    }

    #[test]
    fn hex_rendering() {
        let sum = StrongSum::from(vec![0x00, 0xab, 0x10]);
        assert_eq!(sum.to_hex(), "00ab10");
        assert_eq!(sum.to_string(), "00ab10");
        assert!(format!("{sum:?}").contains("00ab10"));
    }

    #[test]
    fn length_accessors() {
        assert!(StrongSum::default().is_empty());
        assert_eq!(StrongSum::from(vec![0u8; 20]).len(), 20);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_base64() {
        let sum = StrongSum::from(b"hash".to_vec());
        let json = serde_json::to_string(&sum).expect("serialize");
        assert_eq!(json, "\"aGFzaA==\"");
        let decoded: StrongSum = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, sum);
        assert!(serde_json::from_str::<StrongSum>("\"***\"").is_err());
    }
}
