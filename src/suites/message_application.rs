//! Applying single messages: value transfer and sender validation.

use anyhow::Result;

use chain_validation_core::producer::{nonce, value};
use chain_validation_core::{Applier, TestDriver};
use chain_validation_types::{Address, ExitCode, TokenAmount};

use super::expect_eq;
use crate::harness::{Scenario, ScenarioVisitor};

pub const SUITE: &str = "message_application";

pub fn visit<V: ScenarioVisitor>(visitor: &mut V) {
    visitor.visit(&ValueTransfer);
    visitor.visit(&UnknownSender);
    visitor.visit(&BadNonce);
    visitor.visit(&InsufficientValue);
}

/// A pays B 50 with default gas. A ends at `balance - 50 - gas_used`.
pub struct ValueTransfer;

impl Scenario for ValueTransfer {
    fn name(&self) -> &'static str {
        "value_transfer"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let initial = 10_000_000u64;
        let alice = driver.new_account(initial)?;
        let bob = driver.new_account(0u64)?;

        let msg = driver.producer().transfer(&bob, &alice, &[value(50u64)]);
        let result = driver.apply_expect(&msg, ExitCode::OK)?;

        let gas_used = result.receipt.gas_used as u64;
        expect_eq(
            "sender balance",
            TokenAmount::from(initial - 50 - gas_used),
            driver.balance(&alice)?,
        )?;
        expect_eq("receiver balance", TokenAmount::from(50), driver.balance(&bob)?)?;
        Ok(())
    }
}

/// A sender the SUT has never seen is rejected with `SysErrSenderInvalid`.
pub struct UnknownSender;

impl Scenario for UnknownSender {
    fn name(&self) -> &'static str {
        "unknown_sender"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let bob = driver.new_account(0u64)?;
        let ghost = Address::new_secp256k1(b"never-created");

        let msg = driver.producer().transfer(&bob, &ghost, &[value(1u64)]);
        driver.apply_expect(&msg, ExitCode::SYS_ERR_SENDER_INVALID)?;
        expect_eq("receiver balance", TokenAmount::zero(), driver.balance(&bob)?)?;
        Ok(())
    }
}

/// Nonces must match the sender's call sequence number exactly.
pub struct BadNonce;

impl Scenario for BadNonce {
    fn name(&self) -> &'static str {
        "bad_nonce"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let alice = driver.new_account(10_000_000u64)?;
        let bob = driver.new_account(0u64)?;

        let ahead = driver.producer().transfer(&bob, &alice, &[value(1u64), nonce(1)]);
        driver.apply_expect(&ahead, ExitCode::SYS_ERR_SENDER_STATE_INVALID)?;

        let first = driver.producer().transfer(&bob, &alice, &[value(1u64), nonce(0)]);
        driver.apply_expect(&first, ExitCode::OK)?;

        let replay = driver.producer().transfer(&bob, &alice, &[value(1u64), nonce(0)]);
        driver.apply_expect(&replay, ExitCode::SYS_ERR_SENDER_STATE_INVALID)?;

        let next = driver.producer().transfer(&bob, &alice, &[value(1u64), nonce(1)]);
        driver.apply_expect(&next, ExitCode::OK)?;

        expect_eq("receiver balance", TokenAmount::from(2), driver.balance(&bob)?)?;
        Ok(())
    }
}

/// Sending the whole balance leaves nothing for gas and must fail with
/// `SysErrInsufficientFunds` without moving value.
pub struct InsufficientValue;

impl Scenario for InsufficientValue {
    fn name(&self) -> &'static str {
        "insufficient_value"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let balance = 2_000_000u64;
        let alice = driver.new_account(balance)?;
        let bob = driver.new_account(0u64)?;

        let msg = driver.producer().transfer(&bob, &alice, &[value(balance)]);
        driver.apply_expect(&msg, ExitCode::SYS_ERR_INSUFFICIENT_FUNDS)?;
        expect_eq("receiver balance", TokenAmount::zero(), driver.balance(&bob)?)?;
        Ok(())
    }
}
