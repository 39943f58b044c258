//! Randomness supplied to tip-set application.
//!
//! The source is plain data rather than a callback so the same value can be
//! handed to an in-process SUT or shipped across the RPC boundary.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::tipset::ChainEpoch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Randomness {
    #[serde(with = "hex_seed")]
    seed: [u8; 32],
}

impl Randomness {
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    /// Deterministic source derived from a label, e.g. the test name.
    pub fn from_label(label: &str) -> Self {
        Self::new(Sha256::digest(label.as_bytes()).into())
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Draw 32 bytes for a domain-separation tag, epoch and entropy.
    pub fn draw(&self, tag: i64, epoch: ChainEpoch, entropy: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(tag.to_be_bytes());
        hasher.update(epoch.to_be_bytes());
        hasher.update(entropy);
        hasher.finalize().into()
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Self::new([0u8; 32])
    }
}

mod hex_seed {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(seed: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(seed))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| serde::de::Error::custom(format!("seed length {}", b.len())))
    }
}
