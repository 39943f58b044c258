//! Chain Validation
//!
//! Conformance scenarios for blockchain VM implementations. A scenario is
//! written once against [`TestDriver`](chain_validation_core::TestDriver)
//! and runs unchanged on any [`Binding`]:
//!
//! - **Local**: the reference sandbox machine linked into the test binary
//! - **Rpc**: an external system under test speaking the RPC driving protocol
//! - **LoopbackRpc**: the sandbox machine behind an in-process RPC server
//!
//! Gas used and state roots are checked against golden fixtures recorded
//! from a reference run. See [`harness`] for running scenarios and
//! [`suites`] for the seed suites.

pub mod harness;
pub mod suites;

pub use harness::{
    run_scenario, Binding, FixtureContext, Scenario, ScenarioOutcome, ScenarioVisitor,
    SuiteRunner,
};
pub use suites::{suite_names, visit_all};
