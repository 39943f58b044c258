//! Per-test driver.
//!
//! A [`TestDriver`] bundles what one scenario needs: a [`Validator`] over
//! one binding, that binding's state handle, the execution context, a
//! [`MessageProducer`] and the test's [`FixtureOracle`]. Every apply goes
//! through the oracle; fixture and exit-code mismatches on enabled
//! channels come back as [`HarnessError::Mismatch`].
//!
//! A recording is written once at teardown, and only for a passing run:
//! either [`TestDriver::finish`] or drop on a thread that is not
//! panicking, provided no driver call has failed.

use anyhow::{anyhow, Result};
use tracing::{debug, error};

use chain_validation_types::cid::builtin;
use chain_validation_types::{
    Actor, Address, ApplyMessageResult, ApplyTipSetResult, BlockMessagesInfo, ChainEpoch, Cid,
    ExecutionContext, ExitCode, Message, Randomness, SignedMessage, TokenAmount,
    ValidationConfig,
};

use crate::applier::{Applier, VmState};
use crate::errors::HarnessError;
use crate::fixtures::{FixtureCheck, FixtureOracle};
use crate::producer::MessageProducer;
use crate::validator::Validator;

/// Miner credited by default.
pub const DEFAULT_MINER_ID: u64 = 1000;

/// Name of the running libtest test (its thread name), e.g.
/// `suites::tipset::dedup_across_pools`.
pub fn default_test_name() -> String {
    match std::thread::current().name() {
        Some(name) if name != "main" => name.to_string(),
        _ => "unnamed".to_string(),
    }
}

pub struct TestDriver<A: Applier> {
    test_name: String,
    validator: Validator<A>,
    state: A::State,
    ctx: ExecutionContext,
    producer: MessageProducer,
    oracle: FixtureOracle,
    config: ValidationConfig,
    applies: usize,
    next_account: u64,
    failed: bool,
    finished: bool,
}

impl<A: Applier> TestDriver<A> {
    pub fn new(
        test_name: impl Into<String>,
        applier: A,
        state: A::State,
        oracle: FixtureOracle,
        config: ValidationConfig,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            validator: Validator::new(applier),
            state,
            ctx: ExecutionContext::new(0, Address::new_id(DEFAULT_MINER_ID)),
            producer: MessageProducer::default(),
            oracle,
            config,
            applies: 0,
            next_account: 0,
            failed: false,
            finished: false,
        }
    }

    pub fn with_context(mut self, ctx: ExecutionContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_producer(mut self, producer: MessageProducer) -> Self {
        self.producer = producer;
        self
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn producer(&mut self) -> &mut MessageProducer {
        &mut self.producer
    }

    pub fn state(&self) -> &A::State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut A::State {
        &mut self.state
    }

    pub fn oracle(&self) -> &FixtureOracle {
        &self.oracle
    }

    pub fn advance_epoch(&mut self, by: ChainEpoch) -> ChainEpoch {
        self.ctx.advance_epoch(by)
    }

    /// Flag the run as failed so nothing is recorded at teardown.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Create a fresh account actor with a new key address.
    pub fn new_account(&mut self, balance: impl Into<TokenAmount>) -> Result<Address> {
        let seed = format!("{}/account-{}", self.test_name, self.next_account);
        self.next_account += 1;
        let key = Address::new_secp256k1(seed.as_bytes());
        let created = self.state.create_actor(
            &builtin::account_actor_code(),
            &key,
            balance.into(),
            builtin::empty_object(),
        );
        let (_, id) = self.guard(created)?;
        debug!(test = %self.test_name, %key, %id, "created account");
        Ok(key)
    }

    pub fn actor(&self, address: &Address) -> Result<Option<Actor>> {
        self.state.actor(address)
    }

    pub fn balance(&self, address: &Address) -> Result<TokenAmount> {
        self.state
            .actor(address)?
            .map(|a| a.balance)
            .ok_or_else(|| anyhow!("actor {} not found", address))
    }

    pub fn root(&self) -> Result<Cid> {
        self.state.root()
    }

    pub fn apply(&mut self, msg: &Message) -> Result<ApplyMessageResult> {
        let result = self.validator.apply_message(&self.ctx, &mut self.state, msg);
        let result = self.guard(result)?;
        self.observe(result.receipt.gas_used, &result.root)?;
        Ok(result)
    }

    pub fn apply_expect(
        &mut self,
        msg: &Message,
        exit_code: ExitCode,
    ) -> Result<ApplyMessageResult> {
        let result = self.apply(msg)?;
        self.expect_exit_code(&result, exit_code)?;
        Ok(result)
    }

    pub fn apply_signed(&mut self, msg: &SignedMessage) -> Result<ApplyMessageResult> {
        let result = self
            .validator
            .apply_signed_message(&self.ctx, &mut self.state, msg);
        let result = self.guard(result)?;
        self.observe(result.receipt.gas_used, &result.root)?;
        Ok(result)
    }

    pub fn apply_signed_expect(
        &mut self,
        msg: &SignedMessage,
        exit_code: ExitCode,
    ) -> Result<ApplyMessageResult> {
        let result = self.apply_signed(msg)?;
        self.expect_exit_code(&result, exit_code)?;
        Ok(result)
    }

    /// Apply a tip-set at the current epoch. The fixture sees the total gas
    /// of the tip-set and its resulting root as one observation.
    pub fn apply_tip_set(
        &mut self,
        blocks: &[BlockMessagesInfo],
        randomness: &Randomness,
    ) -> Result<ApplyTipSetResult> {
        let result =
            self.validator
                .apply_tip_set_messages(&mut self.state, blocks, self.ctx.epoch, randomness);
        let result = self.guard(result)?;
        self.observe(result.total_gas_used(), &result.root)?;
        Ok(result)
    }

    pub fn expect_exit_code(
        &mut self,
        result: &ApplyMessageResult,
        expected: ExitCode,
    ) -> Result<()> {
        let actual = result.receipt.exit_code;
        if actual == expected || !self.config.check_exit_code {
            return Ok(());
        }
        self.failed = true;
        Err(HarnessError::mismatch(
            format!("{} exit code (apply #{})", self.test_name, self.applies),
            expected,
            actual,
        )
        .into())
    }

    pub fn expect_return(&mut self, result: &ApplyMessageResult, expected: &[u8]) -> Result<()> {
        if result.receipt.return_value == expected || !self.config.check_return_value {
            return Ok(());
        }
        self.failed = true;
        Err(HarnessError::mismatch(
            format!("{} return value (apply #{})", self.test_name, self.applies),
            hex::encode(expected),
            hex::encode(&result.receipt.return_value),
        )
        .into())
    }

    fn observe(&mut self, gas_used: i64, root: &Cid) -> Result<()> {
        self.applies += 1;
        let observation = self.oracle.observe(gas_used, root);

        if self.config.check_gas {
            if let FixtureCheck::Mismatch { expected, actual } = observation.gas {
                self.failed = true;
                return Err(HarnessError::mismatch(
                    format!("{} gas used (apply #{})", self.test_name, self.applies),
                    expected,
                    actual,
                )
                .into());
            }
        }
        if self.config.check_state_root {
            if let FixtureCheck::Mismatch { expected, actual } = observation.root {
                self.failed = true;
                return Err(HarnessError::mismatch(
                    format!("{} state root (apply #{})", self.test_name, self.applies),
                    expected,
                    actual,
                )
                .into());
            }
        }
        Ok(())
    }

    /// End a passing run, persisting any recording.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        if self.failed {
            return Ok(());
        }
        self.oracle.finish()
    }
}

impl<A: Applier> Drop for TestDriver<A> {
    fn drop(&mut self) {
        if self.finished || self.failed || std::thread::panicking() {
            return;
        }
        if let Err(e) = self.oracle.finish() {
            error!(test = %self.test_name, "failed to persist fixture: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixtureEntry, FixtureStore, FixtureWriter};
    use crate::local::LocalApplier;
    use crate::producer::value;
    use crate::sandbox::SandboxMachine;
    use crate::FailureKind;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn driver(oracle: FixtureOracle) -> TestDriver<LocalApplier<SandboxMachine>> {
        TestDriver::new(
            "driver::T",
            LocalApplier::new(),
            SandboxMachine::new(),
            oracle,
            ValidationConfig::default(),
        )
    }

    fn transfer_once(d: &mut TestDriver<LocalApplier<SandboxMachine>>) -> ApplyMessageResult {
        let alice = d.new_account(10_000_000u64).unwrap();
        let bob = d.new_account(0u64).unwrap();
        let msg = d.producer().transfer(&bob, &alice, &[value(50u64)]);
        d.apply_expect(&msg, ExitCode::OK).unwrap()
    }

    #[test]
    fn test_exit_code_mismatch_is_conformance_failure() {
        let mut d = driver(FixtureOracle::Disabled);
        let alice = d.new_account(10u64).unwrap();
        let msg = d
            .producer()
            .transfer(&Address::new_id(5), &alice, &[]);
        let err = d.apply_expect(&msg, ExitCode::OK).unwrap_err();
        assert_eq!(FailureKind::classify(&err), FailureKind::Conformance);
    }

    #[test]
    fn test_recording_persisted_on_finish_only_when_passing() {
        let dir = TempDir::new().unwrap();
        let mut d = driver(FixtureOracle::recording("driver::T", FixtureWriter::new(dir.path())));
        let result = transfer_once(&mut d);
        d.finish().unwrap();

        let store = FixtureStore::load(dir.path()).unwrap();
        let entry = store.get("driver::T").unwrap();
        assert_eq!(entry.gas, vec![result.receipt.gas_used]);
        assert_eq!(entry.state_roots, vec![result.root]);

        let failing_dir = TempDir::new().unwrap();
        let mut d = driver(FixtureOracle::recording(
            "driver::T",
            FixtureWriter::new(failing_dir.path()),
        ));
        transfer_once(&mut d);
        d.mark_failed();
        drop(d);
        assert!(FixtureStore::load(failing_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_recording_persisted_on_drop() {
        let dir = TempDir::new().unwrap();
        {
            let mut d = driver(FixtureOracle::recording("driver::T", FixtureWriter::new(dir.path())));
            transfer_once(&mut d);
        }
        assert!(FixtureStore::load(dir.path()).unwrap().get("driver::T").is_some());
    }

    #[test]
    fn test_fixture_gas_mismatch_respects_toggle() {
        let store = Arc::new(FixtureStore::from_entries([(
            "driver::T".to_string(),
            FixtureEntry {
                gas: vec![1],
                state_roots: vec![],
            },
        )]));

        let mut d = driver(FixtureOracle::replaying(store.clone(), "driver::T"));
        let alice = d.new_account(10_000_000u64).unwrap();
        let msg = d.producer().transfer(&alice, &alice, &[]);
        let err = d.apply(&msg).unwrap_err();
        assert!(err.to_string().contains("gas used"));

        let mut lenient = TestDriver::new(
            "driver::T",
            LocalApplier::<SandboxMachine>::new(),
            SandboxMachine::new(),
            FixtureOracle::replaying(store, "driver::T"),
            ValidationConfig {
                check_gas: false,
                ..ValidationConfig::default()
            },
        );
        let alice = lenient.new_account(10_000_000u64).unwrap();
        let msg = lenient.producer().transfer(&alice, &alice, &[]);
        assert!(lenient.apply(&msg).is_ok());
    }
}
