//! Chain messages.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::amount::TokenAmount;
use crate::cid::Cid;
use crate::encoding::{base64_bytes, CanonicalHasher};

pub type MethodNum = u64;

/// Method number of a plain value transfer.
pub const METHOD_SEND: MethodNum = 0;

/// An unsigned message. Immutable once built; identified by [`Message::cid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub to: Address,
    pub from: Address,
    pub call_seq_num: u64,
    pub value: TokenAmount,
    pub method: MethodNum,
    #[serde(with = "base64_bytes")]
    pub params: Vec<u8>,
    pub gas_fee_cap: TokenAmount,
    pub gas_premium: TokenAmount,
    pub gas_limit: i64,
}

impl Message {
    fn canonical(&self) -> CanonicalHasher {
        let mut h = CanonicalHasher::new();
        h.field(&self.to.to_bytes())
            .field(&self.from.to_bytes())
            .u64(self.call_seq_num)
            .field(&self.value.to_bytes_be())
            .u64(self.method)
            .field(&self.params)
            .field(&self.gas_fee_cap.to_bytes_be())
            .field(&self.gas_premium.to_bytes_be())
            .i64(self.gas_limit);
        h
    }

    /// Canonical content hash. Two messages with equal fields share a cid.
    pub fn cid(&self) -> Cid {
        self.canonical().cid()
    }

    /// Size of the canonical encoding, charged as on-chain inclusion cost.
    pub fn chain_length(&self) -> usize {
        self.canonical().len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigType {
    Secp256k1,
    Bls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub sig_type: SigType,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl Signature {
    pub fn new_secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SigType::Secp256k1,
            bytes,
        }
    }

    pub fn new_bls(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SigType::Bls,
            bytes,
        }
    }
}

/// A message plus its individual signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: Message,
    pub signature: Signature,
}

impl SignedMessage {
    pub fn new(message: Message, signature: Signature) -> Self {
        Self { message, signature }
    }

    fn canonical(&self) -> CanonicalHasher {
        let mut h = self.message.canonical();
        h.field(&[self.signature.sig_type as u8])
            .field(&self.signature.bytes);
        h
    }

    /// Hash over message and signature.
    ///
    /// Tip-set deduplication keys on `self.message.cid()` instead, so the
    /// same content arriving through both pools is recognised.
    pub fn cid(&self) -> Cid {
        self.canonical().cid()
    }

    pub fn chain_length(&self) -> usize {
        self.canonical().len()
    }
}
