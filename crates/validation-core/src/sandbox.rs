//! Transfer-only reference machine.
//!
//! `SandboxMachine` lets the harness run end to end without an external
//! SUT. It knows exactly one actor kind (accounts) and one method (send).
//! Message validation, gas accounting and miner settlement follow the usual
//! chain rules closely enough for the seed scenarios:
//!
//! - on-chain inclusion gas is `ON_CHAIN_BASE + ON_CHAIN_PER_BYTE * len`;
//!   a message that cannot cover it, an unknown sender, a nonce mismatch or
//!   a sender that cannot cover `gas_limit * gas_fee_cap` is rejected with
//!   no gas used, and the miner is penalised `inclusion_gas * BASE_FEE`
//! - the sender pays `gas_used * min(gas_fee_cap, BASE_FEE + gas_premium)`;
//!   the base fee share is burnt, the rest is held as miner reward until
//!   the block is settled
//! - sends to an unknown key address create an account for it

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::cmp::min;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use chain_validation_types::cid::builtin;
use chain_validation_types::{
    Actor, Address, ChainEpoch, Cid, ExitCode, Message, MessageReceipt, Randomness, TokenAmount,
    METHOD_SEND,
};

use crate::applier::{ApplyOutcome, VmState};
use crate::local::Machine;

pub const BASE_FEE: u64 = 1;
pub const ON_CHAIN_BASE: i64 = 38;
pub const ON_CHAIN_PER_BYTE: i64 = 1;
pub const SEND_GAS: i64 = 100;
pub const ACCOUNT_CREATE_GAS: i64 = 1_000;
/// Paid per winning ticket.
pub const BLOCK_REWARD: u64 = 1_000;
/// IDs below this are reserved.
pub const FIRST_NON_SINGLETON_ID: u64 = 100;
/// Randomness domain tag used by the cron tick.
const CRON_RANDOMNESS_TAG: i64 = 7;

#[derive(Debug, Clone, Serialize)]
struct SandboxState {
    actors: BTreeMap<u64, Actor>,
    /// Key address to assigned ID.
    addresses: BTreeMap<Address, u64>,
    store: BTreeMap<Cid, Vec<u8>>,
    next_id: u64,
    reward_pool: TokenAmount,
    burnt: TokenAmount,
    last_cron: Option<(ChainEpoch, Vec<u8>)>,
}

/// In-memory account-only VM.
#[derive(Debug, Clone)]
pub struct SandboxMachine {
    state: SandboxState,
}

impl Default for SandboxMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxMachine {
    pub fn new() -> Self {
        Self {
            state: SandboxState {
                actors: BTreeMap::new(),
                addresses: BTreeMap::new(),
                store: BTreeMap::new(),
                next_id: FIRST_NON_SINGLETON_ID,
                reward_pool: TokenAmount::zero(),
                burnt: TokenAmount::zero(),
                last_cron: None,
            },
        }
    }

    /// Total burnt so far (base fee share and miner penalties).
    pub fn burnt(&self) -> &TokenAmount {
        &self.state.burnt
    }

    /// Gas rewards collected but not yet paid to a miner.
    pub fn reward_pool(&self) -> &TokenAmount {
        &self.state.reward_pool
    }

    fn resolve(&self, address: &Address) -> Option<u64> {
        match address {
            Address::Id(id) => self.state.actors.contains_key(id).then_some(*id),
            other => self.state.addresses.get(other).copied(),
        }
    }

    fn actor_mut(&mut self, id: u64) -> Result<&mut Actor> {
        self.state
            .actors
            .get_mut(&id)
            .ok_or_else(|| anyhow!("actor t0{} vanished from state", id))
    }

    fn insert_actor(&mut self, address: &Address, actor: Actor) -> Result<u64> {
        if self.resolve(address).is_some() {
            bail!("actor {} already exists", address);
        }
        let id = match address {
            Address::Id(id) => *id,
            _ => self.state.next_id,
        };
        let after = id
            .checked_add(1)
            .ok_or_else(|| anyhow!("actor id space exhausted at {}", address))?;
        if !address.is_id() {
            self.state.addresses.insert(address.clone(), id);
        }
        if id >= self.state.next_id {
            self.state.next_id = after;
        }
        self.state.actors.insert(id, actor);
        Ok(id)
    }

    fn new_account(balance: TokenAmount) -> Actor {
        Actor {
            code: builtin::account_actor_code(),
            head: builtin::empty_object(),
            call_seq_num: 0,
            balance,
        }
    }

    /// Rejected before execution: nothing charged to the sender.
    fn rejected(exit_code: ExitCode, inclusion_gas: i64) -> ApplyOutcome {
        ApplyOutcome {
            receipt: MessageReceipt {
                exit_code,
                return_value: Vec::new(),
                gas_used: 0,
            },
            penalty: &TokenAmount::from(BASE_FEE) * inclusion_gas as u64,
            reward: TokenAmount::zero(),
        }
    }

    /// Runs the send. Returns exit code and execution gas. State is only
    /// touched on success.
    fn execute(
        &mut self,
        sender: u64,
        msg: &Message,
        available: &TokenAmount,
        gas_left: i64,
    ) -> Result<(ExitCode, i64)> {
        let mut gas = SEND_GAS;
        if msg.method != METHOD_SEND {
            return Ok((ExitCode::SYS_ERR_INVALID_METHOD, gas));
        }
        if &msg.value > available {
            return Ok((ExitCode::SYS_ERR_INSUFFICIENT_FUNDS, gas));
        }

        let receiver = match self.resolve(&msg.to) {
            Some(id) => Some(id),
            None if msg.to.is_id() => return Ok((ExitCode::SYS_ERR_INVALID_RECEIVER, gas)),
            None => {
                gas += ACCOUNT_CREATE_GAS;
                None
            }
        };
        if gas > gas_left {
            return Ok((ExitCode::SYS_ERR_OUT_OF_GAS, gas_left));
        }

        let receiver = match receiver {
            Some(id) => id,
            None => {
                debug!(address = %msg.to, "creating account for send target");
                self.insert_actor(&msg.to, Self::new_account(TokenAmount::zero()))?
            }
        };

        let from = self.actor_mut(sender)?;
        from.balance = from
            .balance
            .checked_sub(&msg.value)
            .context("sender balance below checked value")?;
        self.actor_mut(receiver)?.balance += &msg.value;
        Ok((ExitCode::OK, gas))
    }
}

impl VmState for SandboxMachine {
    fn root(&self) -> Result<Cid> {
        let bytes = bcs::to_bytes(&self.state).context("encoding sandbox state")?;
        Ok(Cid::of_bytes(&bytes))
    }

    fn store_get(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.state
            .store
            .get(cid)
            .cloned()
            .ok_or_else(|| anyhow!("block {} not found in store", cid))
    }

    fn store_put(&mut self, data: &[u8]) -> Result<Cid> {
        let cid = Cid::of_bytes(data);
        self.state.store.insert(cid.clone(), data.to_vec());
        Ok(cid)
    }

    fn actor(&self, address: &Address) -> Result<Option<Actor>> {
        Ok(self
            .resolve(address)
            .and_then(|id| self.state.actors.get(&id))
            .cloned())
    }

    fn set_actor_state(
        &mut self,
        address: &Address,
        balance: TokenAmount,
        head: Cid,
    ) -> Result<Actor> {
        let id = self
            .resolve(address)
            .ok_or_else(|| anyhow!("actor {} not found", address))?;
        let actor = self.actor_mut(id)?;
        actor.balance = balance;
        actor.head = head;
        Ok(actor.clone())
    }

    fn create_actor(
        &mut self,
        code: &Cid,
        address: &Address,
        balance: TokenAmount,
        head: Cid,
    ) -> Result<(Actor, Address)> {
        if code != &builtin::account_actor_code() {
            bail!("sandbox only supports account actors, got code {}", code);
        }
        let actor = Actor {
            code: code.clone(),
            head,
            call_seq_num: 0,
            balance,
        };
        let id = self.insert_actor(address, actor.clone())?;
        trace!(%address, id, "created actor");
        Ok((actor, Address::new_id(id)))
    }
}

impl Machine for SandboxMachine {
    fn apply_explicit(
        &mut self,
        epoch: ChainEpoch,
        _miner: &Address,
        msg: &Message,
        chain_length: usize,
    ) -> Result<ApplyOutcome> {
        let inclusion_gas = ON_CHAIN_BASE + ON_CHAIN_PER_BYTE * chain_length as i64;
        if msg.gas_limit < inclusion_gas {
            return Ok(Self::rejected(ExitCode::SYS_ERR_OUT_OF_GAS, inclusion_gas));
        }

        let sender = match self.resolve(&msg.from) {
            Some(id) => id,
            None => return Ok(Self::rejected(ExitCode::SYS_ERR_SENDER_INVALID, inclusion_gas)),
        };
        let from = self.actor_mut(sender)?.clone();
        if from.code != builtin::account_actor_code() {
            return Ok(Self::rejected(ExitCode::SYS_ERR_SENDER_INVALID, inclusion_gas));
        }
        if from.call_seq_num != msg.call_seq_num {
            return Ok(Self::rejected(ExitCode::SYS_ERR_SENDER_STATE_INVALID, inclusion_gas));
        }
        let deposit = &msg.gas_fee_cap * msg.gas_limit as u64;
        let Some(available) = from.balance.checked_sub(&deposit) else {
            return Ok(Self::rejected(ExitCode::SYS_ERR_SENDER_STATE_INVALID, inclusion_gas));
        };

        self.actor_mut(sender)?.call_seq_num += 1;
        let (exit_code, exec_gas) =
            self.execute(sender, msg, &available, msg.gas_limit - inclusion_gas)?;
        let gas_used = min(inclusion_gas + exec_gas, msg.gas_limit);

        let base_fee = TokenAmount::from(BASE_FEE);
        let burn_rate = min(base_fee.clone(), msg.gas_fee_cap.clone());
        let tip_rate = min(
            msg.gas_premium.clone(),
            msg.gas_fee_cap.saturating_sub(&base_fee),
        );
        let burn = &burn_rate * gas_used as u64;
        let reward = &tip_rate * gas_used as u64;

        let from = self.actor_mut(sender)?;
        from.balance = from
            .balance
            .checked_sub(&(&burn + &reward))
            .context("sender balance below gas deposit")?;
        self.state.burnt += &burn;
        self.state.reward_pool += &reward;

        debug!(epoch, %exit_code, gas_used, "sandbox applied message");
        Ok(ApplyOutcome {
            receipt: MessageReceipt {
                exit_code,
                return_value: Vec::new(),
                gas_used,
            },
            penalty: TokenAmount::zero(),
            reward,
        })
    }

    fn apply_block_reward(
        &mut self,
        epoch: ChainEpoch,
        miner: &Address,
        penalty: &TokenAmount,
        gas_reward: &TokenAmount,
        win_count: i64,
    ) -> Result<()> {
        let paid_from_pool = min(gas_reward.clone(), self.state.reward_pool.clone());
        self.state.reward_pool = self.state.reward_pool.saturating_sub(&paid_from_pool);

        let block_reward = &TokenAmount::from(BLOCK_REWARD) * win_count.max(0) as u64;
        let gross = &paid_from_pool + &block_reward;
        let burnt = min(penalty.clone(), gross.clone());
        let payout = gross.saturating_sub(&burnt);
        self.state.burnt += &burnt;

        let id = match self.resolve(miner) {
            Some(id) => id,
            None => self.insert_actor(miner, Self::new_account(TokenAmount::zero()))?,
        };
        self.actor_mut(id)?.balance += &payout;
        debug!(epoch, %miner, %payout, %burnt, "sandbox block reward");
        Ok(())
    }

    fn apply_cron(&mut self, epoch: ChainEpoch, randomness: &Randomness) -> Result<()> {
        let drawn = randomness.draw(CRON_RANDOMNESS_TAG, epoch, &[]);
        self.state.last_cron = Some((epoch, drawn.to_vec()));
        Ok(())
    }
}
