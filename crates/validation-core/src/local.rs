//! In-process binding.
//!
//! A SUT that can be linked into the test binary implements [`Machine`].
//! [`LocalApplier`] then drives it directly, including the tip-set walk:
//!
//! 1. blocks in order; inside each block the BLS pool, then the secp pool
//! 2. a message whose underlying content hash was already seen anywhere
//!    earlier in the tip-set is dropped (no receipt, no charge)
//! 3. after each block, penalties and gas rewards accumulated for that block
//!    are settled with one block reward scaled by its ticket count
//! 4. one cron tick at the end, consuming the tip-set randomness

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, warn};

use chain_validation_types::{
    Address, BlockMessagesInfo, ChainEpoch, ExecutionContext, Message, MessageReceipt,
    Randomness, SignedMessage, TokenAmount,
};

use crate::applier::{Applier, ApplyOutcome, VmState};

/// VM surface a linked-in SUT exposes.
pub trait Machine: VmState {
    /// Apply one message at `epoch`. `chain_length` is the size of the
    /// message as included on chain, which the SUT charges inclusion gas for.
    fn apply_explicit(
        &mut self,
        epoch: ChainEpoch,
        miner: &Address,
        msg: &Message,
        chain_length: usize,
    ) -> Result<ApplyOutcome>;

    /// Settle one block: pay `gas_reward` plus the block reward for
    /// `win_count` tickets to `miner`, less `penalty`.
    fn apply_block_reward(
        &mut self,
        epoch: ChainEpoch,
        miner: &Address,
        penalty: &TokenAmount,
        gas_reward: &TokenAmount,
        win_count: i64,
    ) -> Result<()>;

    /// End-of-tip-set cron tick.
    fn apply_cron(&mut self, epoch: ChainEpoch, randomness: &Randomness) -> Result<()>;
}

/// [`Applier`] over a [`Machine`] living in this process.
pub struct LocalApplier<M> {
    _machine: PhantomData<fn() -> M>,
}

impl<M> LocalApplier<M> {
    pub fn new() -> Self {
        Self {
            _machine: PhantomData,
        }
    }
}

impl<M> Default for LocalApplier<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for LocalApplier<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M: Machine> Applier for LocalApplier<M> {
    type State = M;

    fn apply_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut M,
        msg: &Message,
    ) -> Result<ApplyOutcome> {
        debug!(epoch = ctx.epoch, from = %msg.from, to = %msg.to, nonce = msg.call_seq_num, "apply message");
        state.apply_explicit(ctx.epoch, &ctx.miner, msg, msg.chain_length())
    }

    fn apply_signed_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut M,
        msg: &SignedMessage,
    ) -> Result<ApplyOutcome> {
        debug!(epoch = ctx.epoch, from = %msg.message.from, nonce = msg.message.call_seq_num, "apply signed message");
        state.apply_explicit(ctx.epoch, &ctx.miner, &msg.message, msg.chain_length())
    }

    fn apply_tip_set_messages(
        &self,
        state: &mut M,
        blocks: &[BlockMessagesInfo],
        epoch: ChainEpoch,
        randomness: &Randomness,
    ) -> Result<Vec<MessageReceipt>> {
        let mut seen = HashSet::new();
        let mut receipts = Vec::new();

        for (index, block) in blocks.iter().enumerate() {
            let mut penalty = TokenAmount::zero();
            let mut gas_reward = TokenAmount::zero();

            let bls = block.bls_messages.iter().map(|m| (m, m.chain_length()));
            let secp = block
                .secp_messages
                .iter()
                .map(|sm| (&sm.message, sm.chain_length()));

            for (msg, chain_length) in bls.chain(secp) {
                let cid = msg.cid();
                if !seen.insert(cid.clone()) {
                    warn!(block = index, cid = %cid, "dropping duplicate message in tip-set");
                    continue;
                }
                let outcome = state
                    .apply_explicit(epoch, &block.miner, msg, chain_length)
                    .with_context(|| format!("applying message {} in block {}", cid, index))?;
                penalty += &outcome.penalty;
                gas_reward += &outcome.reward;
                receipts.push(outcome.receipt);
            }

            state
                .apply_block_reward(epoch, &block.miner, &penalty, &gas_reward, block.ticket_count)
                .with_context(|| format!("rewarding block {} miner {}", index, block.miner))?;
        }

        state
            .apply_cron(epoch, randomness)
            .context("end-of-tip-set cron")?;
        debug!(epoch, blocks = blocks.len(), receipts = receipts.len(), "applied tip-set");
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chain_validation_types::{Actor, Cid, ExitCode, Signature};

    /// Records every call so the walk order can be asserted.
    #[derive(Default)]
    struct TraceMachine {
        applied: Vec<u64>,
        rewards: Vec<(Address, u64, u64, i64)>,
        crons: Vec<ChainEpoch>,
        fail_nonce: Option<u64>,
    }

    impl VmState for TraceMachine {
        fn root(&self) -> Result<Cid> {
            Ok(Cid::new(format!("root-{}", self.applied.len())))
        }
        fn store_get(&self, cid: &Cid) -> Result<Vec<u8>> {
            bail!("no block {}", cid)
        }
        fn store_put(&mut self, data: &[u8]) -> Result<Cid> {
            Ok(Cid::of_bytes(data))
        }
        fn actor(&self, _address: &Address) -> Result<Option<Actor>> {
            Ok(None)
        }
        fn set_actor_state(&mut self, a: &Address, _b: TokenAmount, _h: Cid) -> Result<Actor> {
            bail!("no actor {}", a)
        }
        fn create_actor(
            &mut self,
            _code: &Cid,
            a: &Address,
            _b: TokenAmount,
            _h: Cid,
        ) -> Result<(Actor, Address)> {
            bail!("cannot create {}", a)
        }
    }

    impl Machine for TraceMachine {
        fn apply_explicit(
            &mut self,
            _epoch: ChainEpoch,
            _miner: &Address,
            msg: &Message,
            _chain_length: usize,
        ) -> Result<ApplyOutcome> {
            if self.fail_nonce == Some(msg.call_seq_num) {
                bail!("machine exploded");
            }
            self.applied.push(msg.call_seq_num);
            Ok(ApplyOutcome {
                receipt: MessageReceipt {
                    exit_code: ExitCode::OK,
                    return_value: vec![],
                    gas_used: 10 + msg.call_seq_num as i64,
                },
                penalty: TokenAmount::from(1),
                reward: TokenAmount::from(2),
            })
        }

        fn apply_block_reward(
            &mut self,
            _epoch: ChainEpoch,
            miner: &Address,
            penalty: &TokenAmount,
            gas_reward: &TokenAmount,
            win_count: i64,
        ) -> Result<()> {
            self.rewards.push((
                miner.clone(),
                penalty.to_u64().unwrap_or_default(),
                gas_reward.to_u64().unwrap_or_default(),
                win_count,
            ));
            Ok(())
        }

        fn apply_cron(&mut self, epoch: ChainEpoch, _randomness: &Randomness) -> Result<()> {
            self.crons.push(epoch);
            Ok(())
        }
    }

    fn msg(nonce: u64) -> Message {
        Message {
            to: Address::new_id(200),
            from: Address::new_id(100),
            call_seq_num: nonce,
            value: TokenAmount::from(1),
            method: 0,
            params: vec![],
            gas_fee_cap: TokenAmount::from(1),
            gas_premium: TokenAmount::from(1),
            gas_limit: 1_000_000,
        }
    }

    fn signed(nonce: u64) -> SignedMessage {
        SignedMessage::new(msg(nonce), Signature::new_secp256k1(vec![nonce as u8]))
    }

    fn block(miner: u64, bls: Vec<Message>, secp: Vec<SignedMessage>) -> BlockMessagesInfo {
        BlockMessagesInfo {
            bls_messages: bls,
            secp_messages: secp,
            miner: Address::new_id(miner),
            ticket_count: 1,
        }
    }

    #[test]
    fn test_bls_before_secp_within_block() {
        let mut m = TraceMachine::default();
        let blocks = vec![block(1, vec![msg(2), msg(3)], vec![signed(0), signed(1)])];
        let receipts = LocalApplier::<TraceMachine>::new()
            .apply_tip_set_messages(&mut m, &blocks, 5, &Randomness::default())
            .unwrap();
        assert_eq!(m.applied, vec![2, 3, 0, 1]);
        let gas: Vec<i64> = receipts.iter().map(|r| r.gas_used).collect();
        assert_eq!(gas, vec![12, 13, 10, 11]);
    }

    #[test]
    fn test_duplicates_dropped_across_pools_and_blocks() {
        let mut m = TraceMachine::default();
        let blocks = vec![
            block(1, vec![msg(0)], vec![signed(0), signed(1)]),
            block(2, vec![msg(1), msg(2)], vec![signed(2)]),
        ];
        let receipts = LocalApplier::<TraceMachine>::new()
            .apply_tip_set_messages(&mut m, &blocks, 5, &Randomness::default())
            .unwrap();
        assert_eq!(m.applied, vec![0, 1, 2]);
        assert_eq!(receipts.len(), 3);
    }

    #[test]
    fn test_block_rewards_and_single_cron() {
        let mut m = TraceMachine::default();
        let mut second = block(2, vec![msg(1)], vec![]);
        second.ticket_count = 3;
        let blocks = vec![block(1, vec![msg(0)], vec![signed(0)]), second];
        LocalApplier::<TraceMachine>::new()
            .apply_tip_set_messages(&mut m, &blocks, 7, &Randomness::default())
            .unwrap();

        assert_eq!(
            m.rewards,
            vec![(Address::new_id(1), 1, 2, 1), (Address::new_id(2), 1, 2, 3)]
        );
        assert_eq!(m.crons, vec![7]);
    }

    #[test]
    fn test_machine_error_propagates() {
        let mut m = TraceMachine {
            fail_nonce: Some(1),
            ..TraceMachine::default()
        };
        let blocks = vec![block(1, vec![msg(0), msg(1)], vec![])];
        let err = LocalApplier::<TraceMachine>::new()
            .apply_tip_set_messages(&mut m, &blocks, 1, &Randomness::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("machine exploded"));
        assert!(m.crons.is_empty());
    }
}
