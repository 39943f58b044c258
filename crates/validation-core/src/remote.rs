//! RPC binding.
//!
//! All VM state lives in the remote process. [`RemoteVm`] is only a handle
//! to the server's current VM; it caches the root reported by the last
//! apply reply so the [`Validator`](crate::Validator) does not need a second
//! round trip per message.
//!
//! Transport failures come back as [`RpcError`] inside the `anyhow::Error`
//! and can be recovered with `downcast_ref`.

use anyhow::Result;
use std::cell::RefCell;
use std::time::Duration;
use tracing::debug;

use chain_validation_transport::{RpcClient, RpcError};
use chain_validation_types::{
    Actor, Address, BlockMessagesInfo, ChainEpoch, Cid, ExecutionContext, Message,
    MessageReceipt, Randomness, SignedMessage, TokenAmount, ValidationConfig,
};

use crate::applier::{Applier, ApplyOutcome, VmState};

/// Handle to the remote server's current VM.
#[derive(Debug)]
pub struct RemoteVm {
    client: RpcClient,
    cached_root: RefCell<Option<Cid>>,
}

impl RemoteVm {
    fn new(client: RpcClient) -> Self {
        Self {
            client,
            cached_root: RefCell::new(None),
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    fn invalidate(&self) {
        self.cached_root.borrow_mut().take();
    }

    fn remember(&self, root: Cid) {
        *self.cached_root.borrow_mut() = Some(root);
    }
}

impl VmState for RemoteVm {
    fn root(&self) -> Result<Cid> {
        if let Some(root) = self.cached_root.borrow().as_ref() {
            return Ok(root.clone());
        }
        let root = self.client.root()?;
        self.remember(root.clone());
        Ok(root)
    }

    fn store_get(&self, cid: &Cid) -> Result<Vec<u8>> {
        Ok(self.client.store_get(cid)?)
    }

    fn store_put(&mut self, data: &[u8]) -> Result<Cid> {
        self.invalidate();
        Ok(self.client.store_put(data)?)
    }

    fn actor(&self, address: &Address) -> Result<Option<Actor>> {
        Ok(self.client.actor(address)?)
    }

    fn set_actor_state(
        &mut self,
        address: &Address,
        balance: TokenAmount,
        head: Cid,
    ) -> Result<Actor> {
        self.invalidate();
        Ok(self.client.set_actor_state(address, &balance, &head)?)
    }

    fn create_actor(
        &mut self,
        code: &Cid,
        address: &Address,
        balance: TokenAmount,
        head: Cid,
    ) -> Result<(Actor, Address)> {
        self.invalidate();
        let reply = self.client.create_actor(code, address, &balance, &head)?;
        Ok((reply.actor, reply.address))
    }
}

/// [`Applier`] that drives a SUT over the RPC driving protocol.
#[derive(Debug, Clone)]
pub struct RpcApplier {
    client: RpcClient,
}

impl RpcApplier {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    pub fn connect(endpoint: &str, timeout: Duration) -> Self {
        Self::new(RpcClient::new(endpoint, timeout))
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Ask the server for a fresh VM and return a handle to it.
    pub fn new_vm(&self, test_name: Option<&str>) -> Result<RemoteVm, RpcError> {
        self.client.new_vm(test_name)?;
        debug!(url = self.client.url(), test = ?test_name, "remote VM created");
        Ok(RemoteVm::new(self.client.clone()))
    }

    pub fn validation_config(&self) -> Result<ValidationConfig, RpcError> {
        self.client.validation_config()
    }
}

impl Applier for RpcApplier {
    type State = RemoteVm;

    fn apply_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut RemoteVm,
        msg: &Message,
    ) -> Result<ApplyOutcome> {
        state.invalidate();
        let reply = state.client.apply_message(ctx.epoch, &ctx.miner, msg)?;
        state.remember(reply.root);
        Ok(ApplyOutcome {
            receipt: reply.receipt,
            penalty: reply.penalty,
            reward: reply.reward,
        })
    }

    fn apply_signed_message(
        &self,
        ctx: &ExecutionContext,
        state: &mut RemoteVm,
        msg: &SignedMessage,
    ) -> Result<ApplyOutcome> {
        state.invalidate();
        let reply = state
            .client
            .apply_signed_message(ctx.epoch, &ctx.miner, msg)?;
        state.remember(reply.root);
        Ok(ApplyOutcome {
            receipt: reply.receipt,
            penalty: reply.penalty,
            reward: reply.reward,
        })
    }

    fn apply_tip_set_messages(
        &self,
        state: &mut RemoteVm,
        blocks: &[BlockMessagesInfo],
        epoch: ChainEpoch,
        randomness: &Randomness,
    ) -> Result<Vec<MessageReceipt>> {
        state.invalidate();
        let reply = state
            .client
            .apply_tip_set_messages(epoch, blocks, randomness)?;
        state.remember(reply.root);
        Ok(reply.receipts)
    }
}
