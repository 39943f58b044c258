//! Thin orchestrator over one [`Applier`].

use anyhow::Result;

use chain_validation_types::{
    ApplyMessageResult, ApplyTipSetResult, BlockMessagesInfo, ChainEpoch, ExecutionContext,
    Message, Randomness, SignedMessage,
};

use crate::applier::{Applier, ApplyOutcome, VmState};

/// Scenario code is written against `Validator`, which makes it portable
/// between bindings. It only translates applier outputs into result types.
pub struct Validator<A: Applier> {
    applier: A,
}

impl<A: Applier> Validator<A> {
    pub fn new(applier: A) -> Self {
        Self { applier }
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    pub fn apply_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut A::State,
        msg: &Message,
    ) -> Result<ApplyMessageResult> {
        let outcome = self.applier.apply_message(ctx, state, msg)?;
        Self::message_result(outcome, state)
    }

    pub fn apply_signed_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut A::State,
        msg: &SignedMessage,
    ) -> Result<ApplyMessageResult> {
        let outcome = self.applier.apply_signed_message(ctx, state, msg)?;
        Self::message_result(outcome, state)
    }

    pub fn apply_tip_set_messages(
        &self,
        state: &mut A::State,
        blocks: &[BlockMessagesInfo],
        epoch: ChainEpoch,
        randomness: &Randomness,
    ) -> Result<ApplyTipSetResult> {
        let receipts = self
            .applier
            .apply_tip_set_messages(state, blocks, epoch, randomness)?;
        Ok(ApplyTipSetResult {
            receipts,
            root: state.root()?,
        })
    }

    fn message_result(outcome: ApplyOutcome, state: &A::State) -> Result<ApplyMessageResult> {
        Ok(ApplyMessageResult {
            receipt: outcome.receipt,
            penalty: outcome.penalty,
            reward: outcome.reward,
            root: state.root()?,
        })
    }
}
