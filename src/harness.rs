//! Running scenarios against a binding.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use chain_validation_core::{
    sanitize_test_name, Applier, BindingKind, FixtureMode, FixtureOracle, FixtureStore,
    HarnessConfig, LocalApplier, MachineService, RpcApplier, SandboxMachine, TestDriver,
    ValidationConfig,
};
use chain_validation_transport::RpcServer;

/// Timeout used against the in-process loopback server.
const LOOPBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// One conformance scenario, written once against [`TestDriver`] and run
/// unchanged on every binding.
pub trait Scenario {
    fn name(&self) -> &'static str;

    /// Suite this scenario belongs to; the config service can disable it.
    fn suite(&self) -> &'static str;

    fn run<A: Applier>(&self, driver: &mut TestDriver<A>) -> Result<()>;
}

/// Callback for enumerating scenarios without boxing them.
pub trait ScenarioVisitor {
    fn visit<S: Scenario>(&mut self, scenario: &S);
}

/// Where the system under test runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// [`SandboxMachine`] linked into this process.
    Local,
    /// An external server speaking the RPC driving protocol.
    Rpc { endpoint: String, timeout: Duration },
    /// [`SandboxMachine`] behind a throwaway in-process RPC server.
    LoopbackRpc,
}

impl Binding {
    pub fn from_config(config: &HarnessConfig) -> Self {
        match config.binding {
            BindingKind::Local => Binding::Local,
            BindingKind::Rpc => Binding::Rpc {
                endpoint: config.rpc_endpoint(),
                timeout: config.rpc_timeout,
            },
        }
    }
}

/// Fixture settings shared by every scenario of a run. The store is loaded
/// once and only read afterwards.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    mode: FixtureMode,
    root: PathBuf,
    store: Arc<FixtureStore>,
}

impl FixtureContext {
    pub fn disabled() -> Self {
        Self {
            mode: FixtureMode::Off,
            root: PathBuf::new(),
            store: Arc::new(FixtureStore::empty()),
        }
    }

    pub fn recording(root: impl Into<PathBuf>) -> Self {
        Self {
            mode: FixtureMode::Record,
            root: root.into(),
            store: Arc::new(FixtureStore::empty()),
        }
    }

    pub fn replaying(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let store = FixtureStore::load(&root)
            .with_context(|| format!("loading fixtures from {}", root.display()))?;
        Ok(Self {
            mode: FixtureMode::Replay,
            root,
            store: Arc::new(store),
        })
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        match config.fixture_mode {
            FixtureMode::Off => Ok(Self::disabled()),
            FixtureMode::Record => Ok(Self::recording(&config.fixture_root)),
            FixtureMode::Replay => Self::replaying(&config.fixture_root),
        }
    }

    pub fn mode(&self) -> FixtureMode {
        self.mode
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn oracle(&self, test_name: &str) -> FixtureOracle {
        FixtureOracle::for_mode(self.mode, self.store.clone(), &self.root, test_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioOutcome {
    Passed,
    /// The scenario's suite is disabled by the validation config.
    Skipped,
}

/// Build a driver for `binding`, run `scenario` on it and tear down.
///
/// `test_name` keys the fixture; pass
/// [`default_test_name`](chain_validation_core::default_test_name) from a
/// libtest test.
pub fn run_scenario<S: Scenario>(
    scenario: &S,
    binding: &Binding,
    fixtures: &FixtureContext,
    test_name: &str,
) -> Result<ScenarioOutcome> {
    match binding {
        Binding::Local => drive(
            scenario,
            LocalApplier::<SandboxMachine>::new(),
            SandboxMachine::new(),
            ValidationConfig::default(),
            fixtures,
            test_name,
        ),
        Binding::Rpc { endpoint, timeout } => {
            run_remote(scenario, endpoint, *timeout, fixtures, test_name)
        }
        Binding::LoopbackRpc => {
            let server = RpcServer::spawn(
                "127.0.0.1:0".parse()?,
                MachineService::new(SandboxMachine::new),
                ValidationConfig::default(),
            )?;
            run_remote(scenario, &server.endpoint(), LOOPBACK_TIMEOUT, fixtures, test_name)
        }
    }
}

fn run_remote<S: Scenario>(
    scenario: &S,
    endpoint: &str,
    timeout: Duration,
    fixtures: &FixtureContext,
    test_name: &str,
) -> Result<ScenarioOutcome> {
    let applier = RpcApplier::connect(endpoint, timeout);
    let config = applier
        .validation_config()
        .context("fetching validation config")?;
    if !config.suite_enabled(scenario.suite()) {
        info!(scenario = scenario.name(), suite = scenario.suite(), "suite disabled, skipping");
        return Ok(ScenarioOutcome::Skipped);
    }
    let vm = applier
        .new_vm(Some(&sanitize_test_name(test_name)))
        .context("creating remote VM")?;
    drive(scenario, applier, vm, config, fixtures, test_name)
}

fn drive<S: Scenario, A: Applier>(
    scenario: &S,
    applier: A,
    state: A::State,
    config: ValidationConfig,
    fixtures: &FixtureContext,
    test_name: &str,
) -> Result<ScenarioOutcome> {
    if !config.suite_enabled(scenario.suite()) {
        info!(scenario = scenario.name(), suite = scenario.suite(), "suite disabled, skipping");
        return Ok(ScenarioOutcome::Skipped);
    }

    let oracle = fixtures.oracle(test_name);
    let mut driver = TestDriver::new(test_name, applier, state, oracle, config);
    match scenario.run(&mut driver) {
        Ok(()) => {
            driver.finish()?;
            Ok(ScenarioOutcome::Passed)
        }
        Err(e) => {
            driver.mark_failed();
            Err(e.context(format!("scenario '{}' failed", scenario.name())))
        }
    }
}

/// Runs every visited scenario and collects the outcomes by name.
pub struct SuiteRunner<'a> {
    binding: &'a Binding,
    fixtures: &'a FixtureContext,
    pub outcomes: Vec<(&'static str, Result<ScenarioOutcome>)>,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(binding: &'a Binding, fixtures: &'a FixtureContext) -> Self {
        Self {
            binding,
            fixtures,
            outcomes: Vec::new(),
        }
    }
}

impl ScenarioVisitor for SuiteRunner<'_> {
    fn visit<S: Scenario>(&mut self, scenario: &S) {
        let test_name = format!("{}::{}", scenario.suite(), scenario.name());
        let outcome = run_scenario(scenario, self.binding, self.fixtures, &test_name);
        self.outcomes.push((scenario.name(), outcome));
    }
}
