//! Shared types for the chain-validation workspace.
//!
//! This crate holds the plain data exchanged between scenario code, the
//! `Applier` bindings and the RPC driving protocol. Nothing here executes a
//! message; receipts are only ever produced by the system under test.
//!
//! ## Modules
//!
//! - [`address`] - Actor addresses (ID and key-derived)
//! - [`amount`] - Arbitrary-precision token amounts
//! - [`cid`] - Opaque content hashes and state-root identifiers
//! - [`message`] - Unsigned and signed chain messages
//! - [`results`] - Receipts, exit codes and apply results
//! - [`tipset`] - Block message descriptors and execution context
//! - [`randomness`] - Serializable randomness source for tip-set application
//! - [`env`] - Environment variable parsing helpers

pub mod address;
pub mod amount;
pub mod cid;
pub mod encoding;
pub mod env;
pub mod message;
pub mod randomness;
pub mod results;
pub mod tipset;

pub use address::Address;
pub use amount::TokenAmount;
pub use cid::Cid;
pub use message::{Message, MethodNum, SigType, Signature, SignedMessage, METHOD_SEND};
pub use randomness::Randomness;
pub use results::{
    Actor, ApplyMessageResult, ApplyTipSetResult, ExitCode, MessageReceipt, ValidationConfig,
};
pub use tipset::{BlockMessagesInfo, ChainEpoch, ExecutionContext};
