//! Expose a [`Machine`] over the RPC driving protocol.

use anyhow::{anyhow, Result};
use tracing::info;

use chain_validation_transport::protocol::*;
use chain_validation_transport::RpcBackend;
use chain_validation_types::{Actor, Cid, ExecutionContext};

use crate::applier::Applier;
use crate::local::{LocalApplier, Machine};

type Factory<M> = Box<dyn Fn() -> M + Send>;

/// [`RpcBackend`] that runs a fresh machine per `NewVM` call and drives it
/// through a [`LocalApplier`], so both bindings share one tip-set walk.
pub struct MachineService<M> {
    factory: Factory<M>,
    current: Option<M>,
    applier: LocalApplier<M>,
}

impl<M: Machine + Send + 'static> MachineService<M> {
    pub fn new(factory: impl Fn() -> M + Send + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            current: None,
            applier: LocalApplier::new(),
        }
    }

    fn vm(&mut self) -> Result<&mut M> {
        self.current
            .as_mut()
            .ok_or_else(|| anyhow!("no current VM; call VMWrapper.NewVM first"))
    }
}

impl<M: Machine + Send + 'static> RpcBackend for MachineService<M> {
    fn new_vm(&mut self, params: NewVmParams) -> Result<()> {
        info!(test = params.test_name.as_deref().unwrap_or("<unnamed>"), "new VM");
        self.current = Some((self.factory)());
        Ok(())
    }

    fn root(&mut self) -> Result<Cid> {
        self.vm()?.root()
    }

    fn store_get(&mut self, cid: &Cid) -> Result<Vec<u8>> {
        self.vm()?.store_get(cid)
    }

    fn store_put(&mut self, data: &[u8]) -> Result<Cid> {
        self.vm()?.store_put(data)
    }

    fn actor(&mut self, params: &ActorParams) -> Result<Option<Actor>> {
        self.vm()?.actor(&params.address)
    }

    fn set_actor_state(&mut self, params: &SetActorStateParams) -> Result<Actor> {
        self.vm()?
            .set_actor_state(&params.address, params.balance.clone(), params.head.clone())
    }

    fn create_actor(&mut self, params: &CreateActorParams) -> Result<CreateActorReply> {
        let (actor, address) = self.vm()?.create_actor(
            &params.code,
            &params.address,
            params.balance.clone(),
            params.head.clone(),
        )?;
        Ok(CreateActorReply { actor, address })
    }

    fn apply_message(&mut self, params: &ApplyMessageParams) -> Result<ApplyMessageReply> {
        let ctx = ExecutionContext::new(params.epoch, params.miner.clone());
        let applier = self.applier.clone();
        let vm = self.vm()?;
        let outcome = applier.apply_message(&ctx, vm, &params.message)?;
        Ok(ApplyMessageReply {
            receipt: outcome.receipt,
            penalty: outcome.penalty,
            reward: outcome.reward,
            root: vm.root()?,
        })
    }

    fn apply_signed_message(
        &mut self,
        params: &ApplySignedMessageParams,
    ) -> Result<ApplyMessageReply> {
        let ctx = ExecutionContext::new(params.epoch, params.miner.clone());
        let applier = self.applier.clone();
        let vm = self.vm()?;
        let outcome = applier.apply_signed_message(&ctx, vm, &params.message)?;
        Ok(ApplyMessageReply {
            receipt: outcome.receipt,
            penalty: outcome.penalty,
            reward: outcome.reward,
            root: vm.root()?,
        })
    }

    fn apply_tip_set_messages(&mut self, params: &ApplyTipSetParams) -> Result<ApplyTipSetReply> {
        let applier = self.applier.clone();
        let vm = self.vm()?;
        let receipts =
            applier.apply_tip_set_messages(vm, &params.blocks, params.epoch, &params.randomness)?;
        Ok(ApplyTipSetReply {
            receipts,
            root: vm.root()?,
        })
    }
}
