//! Validation Core
//!
//! The apply boundary between conformance scenarios and a system under
//! test, plus everything needed to feed and check it:
//!
//! - [`producer`]: [`MessageProducer`] with explicit defaults and pure options
//! - [`tipset`]: [`TipSetMessageBuilder`] and [`TipSetBuilder`]
//! - [`applier`] / [`validator`]: the [`Applier`] seam and [`Validator`]
//! - [`local`]: in-process binding over a [`Machine`]
//! - [`remote`]: RPC binding ([`RpcApplier`], [`RemoteVm`])
//! - [`service`]: [`MachineService`], serving a [`Machine`] over RPC
//! - [`fixtures`]: golden fixture recording and replay
//! - [`driver`]: [`TestDriver`], one per test
//! - [`sandbox`]: [`SandboxMachine`], a transfer-only reference machine
//! - [`config`], [`errors`], [`logging`]: ambient harness setup
//!
//! # Example
//!
//! ```ignore
//! use chain_validation_core::*;
//!
//! let mut driver = TestDriver::new(
//!     default_test_name(),
//!     LocalApplier::new(),
//!     SandboxMachine::new(),
//!     FixtureOracle::Disabled,
//!     ValidationConfig::default(),
//! );
//! let alice = driver.new_account(10_000_000u64)?;
//! let bob = driver.new_account(0u64)?;
//! let msg = driver.producer().transfer(&bob, &alice, &[producer::value(50u64)]);
//! driver.apply_expect(&msg, ExitCode::OK)?;
//! driver.finish()?;
//! ```

pub mod applier;
pub mod config;
pub mod driver;
pub mod errors;
pub mod fixtures;
pub mod local;
pub mod logging;
pub mod producer;
pub mod remote;
pub mod sandbox;
pub mod service;
pub mod tipset;
pub mod validator;

pub use applier::{Applier, ApplyOutcome, VmState};
pub use config::{BindingKind, HarnessConfig};
pub use driver::{default_test_name, TestDriver};
pub use errors::{FailureKind, HarnessError};
pub use fixtures::{
    sanitize_test_name, FixtureCheck, FixtureEntry, FixtureMode, FixtureOracle, FixtureStore,
    FixtureWriter,
};
pub use local::{LocalApplier, Machine};
pub use producer::{MessageDefaults, MessageOpts, MessageProducer};
pub use remote::{RemoteVm, RpcApplier};
pub use sandbox::SandboxMachine;
pub use service::MachineService;
pub use tipset::{TipSetBuilder, TipSetMessageBuilder};
pub use validator::Validator;

pub use chain_validation_types::{ExitCode, ValidationConfig};
