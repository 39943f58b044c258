//! Tip-set application: pool ordering and duplicate suppression.

use anyhow::Result;

use chain_validation_core::producer::{nonce, value};
use chain_validation_core::{Applier, TestDriver, TipSetBuilder, TipSetMessageBuilder};
use chain_validation_types::{Address, ExitCode, Randomness, SignedMessage, TokenAmount};

use super::{dummy_secp_signature, expect_eq};
use crate::harness::{Scenario, ScenarioVisitor};

pub const SUITE: &str = "tipset";

pub fn visit<V: ScenarioVisitor>(visitor: &mut V) {
    visitor.visit(&DedupAcrossPools);
    visitor.visit(&PoolOrdering);
    visitor.visit(&DedupAcrossBlocks);
}

fn miner(id: u64) -> Address {
    Address::new_id(id)
}

fn randomness<A: Applier>(driver: &TestDriver<A>) -> Randomness {
    Randomness::from_label(driver.test_name())
}

/// The same message in the BLS and the secp pool of one block yields a
/// single receipt.
pub struct DedupAcrossPools;

impl Scenario for DedupAcrossPools {
    fn name(&self) -> &'static str {
        "dedup_across_pools"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let alice = driver.new_account(10_000_000u64)?;
        let bob = driver.new_account(0u64)?;
        let msg = driver.producer().transfer(&bob, &alice, &[value(10u64), nonce(0)]);

        let mut block = TipSetMessageBuilder::new(miner(1000));
        block
            .with_bls_message(msg.clone())
            .with_secp_message(SignedMessage::new(msg, dummy_secp_signature()));
        let mut tipset = TipSetBuilder::new();
        tipset.with_block_builder(&block);

        let rand = randomness(driver);
        let result = driver.apply_tip_set(&tipset.build(), &rand)?;
        expect_eq("receipt count", 1, result.receipts.len())?;
        expect_eq("exit code", ExitCode::OK, result.receipts[0].exit_code)?;
        expect_eq("receiver balance", TokenAmount::from(10), driver.balance(&bob)?)?;
        Ok(())
    }
}

/// BLS messages are applied before secp messages regardless of the order
/// they were added in: the secp message carries nonce 1 and only succeeds
/// if the BLS nonce-0 message ran first.
pub struct PoolOrdering;

impl Scenario for PoolOrdering {
    fn name(&self) -> &'static str {
        "pool_ordering"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let alice = driver.new_account(10_000_000u64)?;
        let bob = driver.new_account(0u64)?;
        let carol = driver.new_account(0u64)?;

        let to_carol = driver.producer().transfer(&carol, &alice, &[value(7u64), nonce(1)]);
        let to_bob = driver.producer().transfer(&bob, &alice, &[value(3u64), nonce(0)]);

        let mut block = TipSetMessageBuilder::new(miner(1000));
        block
            .with_secp_message(SignedMessage::new(to_carol, dummy_secp_signature()))
            .with_bls_message(to_bob);
        let mut tipset = TipSetBuilder::new();
        tipset.with_block_builder(&block);

        let rand = randomness(driver);
        let result = driver.apply_tip_set(&tipset.build(), &rand)?;
        expect_eq("receipt count", 2, result.receipts.len())?;
        for receipt in &result.receipts {
            expect_eq("exit code", ExitCode::OK, receipt.exit_code)?;
        }
        expect_eq("bob balance", TokenAmount::from(3), driver.balance(&bob)?)?;
        expect_eq("carol balance", TokenAmount::from(7), driver.balance(&carol)?)?;
        Ok(())
    }
}

/// A message repeated in a later block is dropped; the receipt belongs to
/// its first occurrence.
pub struct DedupAcrossBlocks;

impl Scenario for DedupAcrossBlocks {
    fn name(&self) -> &'static str {
        "dedup_across_blocks"
    }

    fn suite(&self) -> &'static str {
        SUITE
    }

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()> {
        let alice = driver.new_account(10_000_000u64)?;
        let bob = driver.new_account(0u64)?;
        let first = driver.producer().transfer(&bob, &alice, &[value(5u64), nonce(0)]);
        let second = driver.producer().transfer(&bob, &alice, &[value(6u64), nonce(1)]);

        let mut tipset = TipSetBuilder::new();
        let mut block = TipSetMessageBuilder::new(miner(1000));
        block.with_bls_message(first.clone());
        tipset.with_block_builder(&block);

        block
            .clear()
            .with_miner(miner(1001))
            .with_bls_message(first)
            .with_bls_message(second);
        tipset.with_block_builder(&block);

        let rand = randomness(driver);
        let result = driver.apply_tip_set(&tipset.build(), &rand)?;
        expect_eq("receipt count", 2, result.receipts.len())?;
        for receipt in &result.receipts {
            expect_eq("exit code", ExitCode::OK, receipt.exit_code)?;
        }
        expect_eq("receiver balance", TokenAmount::from(11), driver.balance(&bob)?)?;
        Ok(())
    }
}
