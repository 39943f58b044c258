//! Seed conformance suites.
//!
//! Each scenario is a unit struct implementing [`Scenario`]. Literal
//! expectations that do not depend on a fixture are checked with
//! [`expect_eq`], so a violated expectation is a conformance mismatch and
//! not a panic.

pub mod message_application;
pub mod tipset;

use anyhow::Result;
use std::fmt::Display;

use chain_validation_core::HarnessError;
use chain_validation_types::Signature;

use crate::harness::{Scenario, ScenarioVisitor};

/// Visit every scenario of every suite.
pub fn visit_all<V: ScenarioVisitor>(visitor: &mut V) {
    message_application::visit(visitor);
    tipset::visit(visitor);
}

/// Names of every suite, as reported by [`Scenario::suite`].
pub fn suite_names() -> Vec<&'static str> {
    struct Names(Vec<&'static str>);
    impl ScenarioVisitor for Names {
        fn visit<S: Scenario>(&mut self, scenario: &S) {
            if !self.0.contains(&scenario.suite()) {
                self.0.push(scenario.suite());
            }
        }
    }
    let mut names = Names(Vec::new());
    visit_all(&mut names);
    names.0
}

pub fn expect_eq<T: PartialEq + Display>(what: &str, expected: T, actual: T) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::mismatch(what, expected, actual).into())
    }
}

/// Placeholder secp256k1 signature. Signatures are not what these suites
/// exercise.
pub fn dummy_secp_signature() -> Signature {
    Signature::new_secp256k1(vec![0u8; 65])
}
