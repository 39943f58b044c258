//! Opaque content identifiers.
//!
//! A [`Cid`] is only ever compared for equality. The harness never parses
//! one; the SUT decides how state roots are derived.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix applied to hex digests produced inside this workspace.
const CID_PREFIX: &str = "b";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    /// Wrap an identifier received from the SUT.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a SHA-256 digest.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(format!("{}{}", CID_PREFIX, hex::encode(digest)))
    }

    /// Identifier for raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::from_digest(&Sha256::digest(data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known code identifiers shared by scenarios and the SUT.
pub mod builtin {
    use super::Cid;

    pub const ACCOUNT_ACTOR: &str = "fil/1/account";

    pub fn account_actor_code() -> Cid {
        Cid::new(ACCOUNT_ACTOR)
    }

    /// Head of an actor with no state of its own.
    pub fn empty_object() -> Cid {
        Cid::of_bytes(&[])
    }
}
