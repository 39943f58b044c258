//! The apply boundary.
//!
//! [`Applier`] is the single abstraction point between scenario code and the
//! system under test. It has exactly two implementations: the in-process
//! [`LocalApplier`](crate::local::LocalApplier) and the remote
//! [`RpcApplier`](crate::remote::RpcApplier). Each brings its own
//! [`VmState`] type, so a state handle can only ever be passed to the
//! binding that created it.

use anyhow::Result;

use chain_validation_types::{
    Actor, Address, BlockMessagesInfo, ChainEpoch, Cid, ExecutionContext, Message,
    MessageReceipt, Randomness, SignedMessage, TokenAmount,
};

/// State inspection and setup surface of a VM instance.
pub trait VmState {
    /// Current state root. Opaque; compared for equality only.
    fn root(&self) -> Result<Cid>;

    fn store_get(&self, cid: &Cid) -> Result<Vec<u8>>;

    fn store_put(&mut self, data: &[u8]) -> Result<Cid>;

    /// Look up an actor by any address form. `None` if it does not exist.
    fn actor(&self, address: &Address) -> Result<Option<Actor>>;

    /// Replace an existing actor's balance and head.
    fn set_actor_state(&mut self, address: &Address, balance: TokenAmount, head: Cid)
        -> Result<Actor>;

    /// Create an actor, returning it with its assigned ID address.
    fn create_actor(
        &mut self,
        code: &Cid,
        address: &Address,
        balance: TokenAmount,
        head: Cid,
    ) -> Result<(Actor, Address)>;
}

/// Receipt plus the miner penalty and gas reward of one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub receipt: MessageReceipt,
    pub penalty: TokenAmount,
    pub reward: TokenAmount,
}

/// One SUT binding.
///
/// Errors are never swallowed: anything the SUT reports as an error (as
/// opposed to a non-zero exit code) is returned to the caller.
pub trait Applier {
    type State: VmState;

    fn apply_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut Self::State,
        msg: &Message,
    ) -> Result<ApplyOutcome>;

    fn apply_signed_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut Self::State,
        msg: &SignedMessage,
    ) -> Result<ApplyOutcome>;

    /// Apply every block of a tip-set.
    ///
    /// Returns one receipt per canonical message, in the order each was
    /// first processed.
    fn apply_tip_set_messages(
        &self,
        state: &mut Self::State,
        blocks: &[BlockMessagesInfo],
        epoch: ChainEpoch,
        randomness: &Randomness,
    ) -> Result<Vec<MessageReceipt>>;
}
