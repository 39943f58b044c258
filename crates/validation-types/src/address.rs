//! Actor addresses.
//!
//! Addresses render as `t<protocol><payload>`: ID addresses carry a decimal
//! actor ID, key and actor addresses carry a lowercase hex payload. The text
//! form is also the serde form so addresses read naturally in fixtures and
//! on the RPC wire.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a key or actor address payload.
pub const PAYLOAD_HASH_LEN: usize = 20;

/// Length of a BLS public key.
pub const BLS_PUB_LEN: usize = 48;

/// Network prefix used in the text form.
const NETWORK_PREFIX: char = 't';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    /// Actor ID assigned by the state tree.
    Id(u64),
    /// Hash of a secp256k1 public key.
    Secp256k1([u8; PAYLOAD_HASH_LEN]),
    /// Hash of actor creation data.
    Actor([u8; PAYLOAD_HASH_LEN]),
    /// Raw BLS public key.
    Bls(Vec<u8>),
}

fn payload_hash(data: &[u8]) -> [u8; PAYLOAD_HASH_LEN] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; PAYLOAD_HASH_LEN];
    out.copy_from_slice(&digest[..PAYLOAD_HASH_LEN]);
    out
}

impl Address {
    pub fn new_id(id: u64) -> Self {
        Address::Id(id)
    }

    pub fn new_secp256k1(pubkey: &[u8]) -> Self {
        Address::Secp256k1(payload_hash(pubkey))
    }

    pub fn new_actor(data: &[u8]) -> Self {
        Address::Actor(payload_hash(data))
    }

    /// Build a BLS address from a 48-byte public key.
    pub fn new_bls(pubkey: &[u8]) -> Result<Self> {
        if pubkey.len() != BLS_PUB_LEN {
            return Err(anyhow!(
                "invalid BLS public key length: expected {}, got {}",
                BLS_PUB_LEN,
                pubkey.len()
            ));
        }
        Ok(Address::Bls(pubkey.to_vec()))
    }

    pub fn protocol(&self) -> u8 {
        match self {
            Address::Id(_) => 0,
            Address::Secp256k1(_) => 1,
            Address::Actor(_) => 2,
            Address::Bls(_) => 3,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Address::Id(_))
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            Address::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Bytes used when hashing an address into a content identifier.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.protocol()];
        match self {
            Address::Id(id) => out.extend_from_slice(&id.to_be_bytes()),
            Address::Secp256k1(p) | Address::Actor(p) => out.extend_from_slice(p),
            Address::Bls(p) => out.extend_from_slice(p),
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Id(id) => write!(f, "{}0{}", NETWORK_PREFIX, id),
            Address::Secp256k1(p) => write!(f, "{}1{}", NETWORK_PREFIX, hex::encode(p)),
            Address::Actor(p) => write!(f, "{}2{}", NETWORK_PREFIX, hex::encode(p)),
            Address::Bls(p) => write!(f, "{}3{}", NETWORK_PREFIX, hex::encode(p)),
        }
    }
}

fn fixed_payload(hex_str: &str) -> Result<[u8; PAYLOAD_HASH_LEN]> {
    let bytes = hex::decode(hex_str).map_err(|e| anyhow!("invalid address payload: {}", e))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("invalid address payload length {}", b.len()))
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        if chars.next() != Some(NETWORK_PREFIX) {
            return Err(anyhow!("address '{}' must start with '{}'", s, NETWORK_PREFIX));
        }
        let protocol = chars
            .next()
            .ok_or_else(|| anyhow!("address '{}' is missing a protocol", s))?;
        let payload = chars.as_str();
        match protocol {
            '0' => payload
                .parse::<u64>()
                .map(Address::Id)
                .map_err(|e| anyhow!("invalid ID address '{}': {}", s, e)),
            '1' => Ok(Address::Secp256k1(fixed_payload(payload)?)),
            '2' => Ok(Address::Actor(fixed_payload(payload)?)),
            '3' => {
                let bytes =
                    hex::decode(payload).map_err(|e| anyhow!("invalid BLS address: {}", e))?;
                Address::new_bls(&bytes)
            }
            other => Err(anyhow!("unknown address protocol '{}' in '{}'", other, s)),
        }
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_form_round_trips() {
        let addrs = vec![
            Address::new_id(101),
            Address::new_secp256k1(b"alice"),
            Address::new_actor(b"multisig-0"),
            Address::new_bls(&[7u8; BLS_PUB_LEN]).unwrap(),
        ];
        for addr in addrs {
            let parsed: Address = addr.to_string().parse().unwrap();
            assert_eq!(parsed, addr);
        }
    }

    #[test]
    fn test_id_address_display() {
        assert_eq!(Address::new_id(0).to_string(), "t00");
        assert_eq!(Address::new_id(1234).to_string(), "t01234");
    }

    #[test]
    fn test_key_addresses_are_deterministic() {
        assert_eq!(
            Address::new_secp256k1(b"bob"),
            Address::new_secp256k1(b"bob")
        );
        assert_ne!(
            Address::new_secp256k1(b"bob"),
            Address::new_secp256k1(b"carol")
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("f0100".parse::<Address>().is_err());
        assert!("t9abc".parse::<Address>().is_err());
        assert!("t1zz".parse::<Address>().is_err());
        assert!(Address::new_bls(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_serde_uses_text_form() {
        let addr = Address::new_id(42);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"t042\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
