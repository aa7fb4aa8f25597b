//! # Content Digest
//!
//! SHA-256 digests in their structured (32 raw bytes) and canonical
//! (`sha256:<hex>`) forms. Every tier stores the canonical string; all
//! comparisons happen on the structured form.

use crate::primitives::{DIGEST_ALGORITHM, DIGEST_SEPARATOR, SHA256_HEX_LEN, SHA256_LEN};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a string is not a canonical SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// No `algo:` prefix present.
    #[error("missing algorithm prefix")]
    MissingAlgorithm,

    /// Prefix names an algorithm other than sha256.
    #[error("unsupported digest algorithm: {0:?}")]
    UnsupportedAlgorithm(String),

    /// Hex part has the wrong number of characters.
    #[error("invalid hex length {0} (expected 64)")]
    InvalidLength(usize),

    /// Hex part contains non-hex characters.
    #[error("invalid hex encoding")]
    InvalidHex,
}

/// A SHA-256 content digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest([u8; SHA256_LEN]);

impl Digest {
    /// Build a digest from raw hash bytes.
    #[must_use]
    pub const fn from_raw(raw: [u8; SHA256_LEN]) -> Self {
        Self(raw)
    }

    /// Compute the digest of `content`.
    #[must_use]
    pub fn of(content: &[u8]) -> Self {
        Self(Sha256::digest(content).into())
    }

    /// Parse a canonical `sha256:<hex>` string.
    ///
    /// The input must be exactly the canonical form; surrounding whitespace is
    /// malformed. Upper-case hex is accepted.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let (algo, hex_part) = s
            .split_once(DIGEST_SEPARATOR)
            .ok_or(DigestError::MissingAlgorithm)?;
        if algo != DIGEST_ALGORITHM {
            return Err(DigestError::UnsupportedAlgorithm(algo.to_string()));
        }
        if hex_part.len() != SHA256_HEX_LEN {
            return Err(DigestError::InvalidLength(hex_part.len()));
        }
        let mut raw = [0u8; SHA256_LEN];
        hex::decode_to_slice(hex_part, &mut raw).map_err(|_| DigestError::InvalidHex)?;
        Ok(Self(raw))
    }

    /// Parse digest content read from a tier.
    ///
    /// Non-UTF-8 content is reported as invalid hex.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, DigestError> {
        let s = std::str::from_utf8(bytes).map_err(|_| DigestError::InvalidHex)?;
        Self::parse(s)
    }

    /// The raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SHA256_LEN] {
        &self.0
    }

    /// The lower-case hex encoding, without the algorithm prefix.
    #[must_use]
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The algorithm name, always `sha256`.
    #[must_use]
    pub const fn algorithm(&self) -> &'static str {
        DIGEST_ALGORITHM
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", DIGEST_ALGORITHM, DIGEST_SEPARATOR, self.hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str =
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digest_of_empty_content() {
        assert_eq!(Digest::of(b"").to_string(), EMPTY_SHA256);
    }

    #[test]
    fn parse_canonical() {
        let d = Digest::parse(EMPTY_SHA256).expect("parse");
        assert_eq!(d, Digest::of(b""));
        assert_eq!(d.algorithm(), "sha256");
    }

    #[test]
    fn parse_rejects_surrounding_whitespace() {
        assert_eq!(
            Digest::parse(&format!("{}\n", EMPTY_SHA256)),
            Err(DigestError::InvalidLength(65))
        );
        assert_eq!(
            Digest::parse(&format!(" {}", EMPTY_SHA256)),
            Err(DigestError::UnsupportedAlgorithm(" sha256".to_string()))
        );
    }

    #[test]
    fn parse_normalizes_uppercase_hex() {
        let upper = format!("sha256:{}", Digest::of(b"x").hex().to_uppercase());
        let d = Digest::parse(&upper).expect("parse");
        assert_eq!(d, Digest::of(b"x"));
        assert_eq!(d.to_string(), format!("sha256:{}", Digest::of(b"x").hex()));
    }

    #[test]
    fn parse_rejects_missing_algorithm() {
        let hex_only = Digest::of(b"x").hex();
        assert_eq!(
            Digest::parse(&hex_only),
            Err(DigestError::MissingAlgorithm)
        );
    }

    #[test]
    fn parse_rejects_other_algorithms() {
        let s = format!("sha512:{}", Digest::of(b"x").hex());
        assert!(matches!(
            Digest::parse(&s),
            Err(DigestError::UnsupportedAlgorithm(a)) if a == "sha512"
        ));
    }

    #[test]
    fn parse_rejects_bad_length() {
        assert_eq!(
            Digest::parse("sha256:abc"),
            Err(DigestError::InvalidLength(3))
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let s = format!("sha256:{}", "z".repeat(64));
        assert_eq!(Digest::parse(&s), Err(DigestError::InvalidHex));
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        assert_eq!(
            Digest::parse_bytes(&[0xff, 0xfe]),
            Err(DigestError::InvalidHex)
        );
    }

    #[test]
    fn serde_uses_canonical_string() {
        let d = Digest::of(b"layer");
        assert_eq!(postcard_string(&d), d.to_string());
    }

    fn postcard_string(d: &Digest) -> String {
        let bytes = postcard::to_allocvec(d).expect("serialize");
        let back: String = postcard::from_bytes(&bytes).expect("deserialize as string");
        let parsed: Digest = postcard::from_bytes(&bytes).expect("deserialize as digest");
        assert_eq!(&parsed, d);
        back
    }
}
