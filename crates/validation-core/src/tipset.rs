//! Tip-set construction.

use chain_validation_types::{Address, BlockMessagesInfo, Message, SignedMessage};

/// Accumulates one block's messages.
///
/// `build` takes a snapshot and keeps the accumulated state; call `clear`
/// to reuse the builder for another block.
#[derive(Debug, Clone)]
pub struct TipSetMessageBuilder {
    bls_messages: Vec<Message>,
    secp_messages: Vec<SignedMessage>,
    miner: Address,
    ticket_count: i64,
}

impl TipSetMessageBuilder {
    pub fn new(miner: Address) -> Self {
        Self {
            bls_messages: Vec::new(),
            secp_messages: Vec::new(),
            miner,
            ticket_count: 1,
        }
    }

    pub fn with_bls_message(&mut self, msg: Message) -> &mut Self {
        self.bls_messages.push(msg);
        self
    }

    pub fn with_secp_message(&mut self, msg: SignedMessage) -> &mut Self {
        self.secp_messages.push(msg);
        self
    }

    pub fn with_miner(&mut self, miner: Address) -> &mut Self {
        self.miner = miner;
        self
    }

    pub fn with_ticket_count(&mut self, count: i64) -> &mut Self {
        self.ticket_count = count;
        self
    }

    pub fn build(&self) -> BlockMessagesInfo {
        BlockMessagesInfo {
            bls_messages: self.bls_messages.clone(),
            secp_messages: self.secp_messages.clone(),
            miner: self.miner.clone(),
            ticket_count: self.ticket_count,
        }
    }

    /// Drop accumulated messages. Miner and ticket count are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.bls_messages.clear();
        self.secp_messages.clear();
        self
    }
}

/// Batches block descriptors into a tip-set.
#[derive(Debug, Clone, Default)]
pub struct TipSetBuilder {
    blocks: Vec<BlockMessagesInfo>,
}

impl TipSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(&mut self, block: BlockMessagesInfo) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn with_block_builder(&mut self, builder: &TipSetMessageBuilder) -> &mut Self {
        self.with_block(builder.build())
    }

    pub fn blocks(&self) -> &[BlockMessagesInfo] {
        &self.blocks
    }

    pub fn build(&self) -> Vec<BlockMessagesInfo> {
        self.blocks.clone()
    }

    pub fn clear(&mut self) -> &mut Self {
        self.blocks.clear();
        self
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
