//! Encoding utilities shared by the wire and fixture formats.
//!
//! - [`base64_bytes`]: serde adapter so raw byte fields travel as base64 strings
//! - [`CanonicalHasher`]: length-prefixed SHA-256 used to derive content hashes

use anyhow::{anyhow, Result};
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::cid::Cid;

/// Encode bytes to a base64 string.
pub fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 string with a context-aware error message.
pub fn base64_decode(b64: &str, context: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| anyhow!("Failed to decode {} from base64: {}", context, e))
}

/// Serde adapter for `Vec<u8>` fields: `#[serde(with = "base64_bytes")]`.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::base64_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::base64_decode(&s, "byte field").map_err(serde::de::Error::custom)
    }
}

/// Incremental canonical encoder.
///
/// Every field is written with a length prefix so that concatenated values
/// cannot collide. The same writer yields both the canonical bytes (for
/// on-chain size) and the content hash.
#[derive(Default)]
pub struct CanonicalHasher {
    buf: Vec<u8>,
}

impl CanonicalHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf
            .extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.field(&v.to_le_bytes())
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.field(&v.to_le_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn cid(&self) -> Cid {
        Cid::from_digest(&Sha256::digest(&self.buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_prefix_prevents_collisions() {
        let mut a = CanonicalHasher::new();
        a.field(b"ab").field(b"c");
        let mut b = CanonicalHasher::new();
        b.field(b"a").field(b"bc");
        assert_ne!(a.cid(), b.cid());
    }

    #[test]
    fn test_base64_adapter() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "base64_bytes")]
            data: Vec<u8>,
        }
        let w = Wrapper {
            data: vec![0, 1, 2, 255],
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"data":"AAEC/w=="}"#);
        assert_eq!(serde_json::from_str::<Wrapper>(&json).unwrap(), w);
    }

    #[test]
    fn test_base64_decode_reports_context() {
        let err = base64_decode("***", "return value").unwrap_err();
        assert!(err.to_string().contains("return value"));
    }
}
