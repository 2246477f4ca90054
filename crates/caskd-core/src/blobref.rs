//! Content references.
//!
//! Every stored blob is addressed by the digest of its bytes, written as
//! `<digestname>-<hexdigest>` (for example
//! `sha1-0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33`). This module provides
//! the [`BlobRef`] value type and its validation rules; the front-end treats
//! references as opaque handles and never looks inside the digest.
//!
//! # Example
//!
//! ```rust
//! use caskd_core::BlobRef;
//!
//! let r = BlobRef::parse("sha1-0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33").unwrap();
//! assert_eq!(r.digest_name(), "sha1");
//! assert!(BlobRef::valid_ref_str(&r.to_string()));
//! assert!(!BlobRef::valid_ref_str("not-a-valid-ref"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Digest names the server accepts, with the hex length each one implies.
const DIGEST_TABLE: &[(&str, usize)] = &[("sha1", 40), ("sha224", 56), ("sha256", 64)];

/// Error returned when a string is not a well-formed content reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid blobref {input:?}")]
pub struct ParseRefError {
    /// The rejected input.
    pub input: String,
}

/// A validated content reference: digest name plus lowercase hex digest.
///
/// `BlobRef` is cheap to clone and hash, serializes as its string form, and
/// guarantees by construction that the digest name is known and the hex part
/// has the right length and alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobRef {
    digest: String,
    hex: String,
}

impl BlobRef {
    /// Parses a `<digestname>-<hexdigest>` string.
    ///
    /// Returns `None` when the digest name is unknown, the hex part has the
    /// wrong length, or any hex character is not lowercase `[0-9a-f]`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (digest, hex) = s.split_once('-')?;
        let expected_len = DIGEST_TABLE
            .iter()
            .find(|(name, _)| *name == digest)
            .map(|(_, len)| *len)?;
        if hex.len() != expected_len {
            return None;
        }
        if !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return None;
        }
        Some(Self {
            digest: digest.to_string(),
            hex: hex.to_string(),
        })
    }

    /// Returns `true` if `s` parses as a content reference.
    #[must_use]
    pub fn valid_ref_str(s: &str) -> bool {
        Self::parse(s).is_some()
    }

    /// Returns the digest name (e.g. `"sha1"`).
    #[must_use]
    pub fn digest_name(&self) -> &str {
        &self.digest
    }

    /// Returns the lowercase hex digest.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.digest, self.hex)
    }
}

impl FromStr for BlobRef {
    type Err = ParseRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseRefError {
            input: s.to_string(),
        })
    }
}

impl Serialize for BlobRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlobRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A content reference paired with the declared size of the blob it names.
///
/// Used only as a pass-through handle to the storage collaborator; this
/// layer never checks the size against the actual bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedBlobRef {
    /// The content reference.
    #[serde(rename = "blobRef")]
    pub blob: BlobRef,
    /// Declared size in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1: &str = "sha1-0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33";

    #[test]
    fn test_parse_sha1() {
        let r = BlobRef::parse(SHA1).unwrap();
        assert_eq!(r.digest_name(), "sha1");
        assert_eq!(r.hex().len(), 40);
        assert_eq!(r.to_string(), SHA1);
    }

    #[test]
    fn test_parse_sha256() {
        let hex = "a".repeat(64);
        let r = BlobRef::parse(&format!("sha256-{hex}")).unwrap();
        assert_eq!(r.digest_name(), "sha256");
    }

    #[test]
    fn test_reject_unknown_digest() {
        assert!(BlobRef::parse("md5-d41d8cd98f00b204e9800998ecf8427e").is_none());
    }

    #[test]
    fn test_reject_wrong_length() {
        assert!(BlobRef::parse("sha1-0beec7").is_none());
        assert!(BlobRef::parse(&format!("sha1-{}", "a".repeat(64))).is_none());
    }

    #[test]
    fn test_reject_uppercase_hex() {
        assert!(BlobRef::parse("sha1-0BEEC7B5EA3F0FDBC95D0DD47F3C5BC275DA8A33").is_none());
    }

    #[test]
    fn test_reject_non_hex() {
        assert!(BlobRef::parse(&format!("sha1-{}", "g".repeat(40))).is_none());
    }

    #[test]
    fn test_reject_missing_dash() {
        assert!(BlobRef::parse("sha1").is_none());
        assert!(BlobRef::parse("").is_none());
        assert!(!BlobRef::valid_ref_str("not-a-valid-ref"));
    }

    #[test]
    fn test_from_str_error_carries_input() {
        let err = "nope".parse::<BlobRef>().unwrap_err();
        assert_eq!(err.input, "nope");
    }

    #[test]
    fn test_serde_round_trip() {
        let r = BlobRef::parse(SHA1).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, format!("\"{SHA1}\""));

        let back: BlobRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert!(serde_json::from_str::<BlobRef>("\"bogus\"").is_err());
    }

    #[test]
    fn test_sized_ref_serialization() {
        let sized = SizedBlobRef {
            blob: BlobRef::parse(SHA1).unwrap(),
            size: 123,
        };
        let json = serde_json::to_value(&sized).unwrap();
        assert_eq!(json["blobRef"], SHA1);
        assert_eq!(json["size"], 123);
    }
}
