//! Block message descriptors and the execution context.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::message::{Message, SignedMessage};

pub type ChainEpoch = i64;

/// Messages proposed by one block of a tip-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMessagesInfo {
    /// Aggregate-signed pool; applied first.
    pub bls_messages: Vec<Message>,
    /// Individually-signed pool.
    pub secp_messages: Vec<SignedMessage>,
    pub miner: Address,
    pub ticket_count: i64,
}

impl BlockMessagesInfo {
    pub fn message_count(&self) -> usize {
        self.bls_messages.len() + self.secp_messages.len()
    }
}

/// Epoch and fee recipient shared by every apply call of a scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub epoch: ChainEpoch,
    pub miner: Address,
}

impl ExecutionContext {
    pub fn new(epoch: ChainEpoch, miner: Address) -> Self {
        Self { epoch, miner }
    }

    pub fn advance_epoch(&mut self, by: ChainEpoch) -> ChainEpoch {
        self.epoch += by;
        self.epoch
    }
}
