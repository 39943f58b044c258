//! Recording golden fixtures on one binding and replaying them on another.

mod common;

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use chain_validation::suites::message_application::ValueTransfer;
use chain_validation::suites::tipset::DedupAcrossBlocks;
use chain_validation::{run_scenario, Binding, FixtureContext, ScenarioOutcome};
use chain_validation_core::fixtures::FixtureChannel;
use chain_validation_core::{FailureKind, FixtureWriter, MachineService, SandboxMachine};
use chain_validation_transport::RpcServer;
use chain_validation_types::ValidationConfig;
use common::{assert_all_passed, run_all, setup};

#[test]
fn test_record_local_then_replay_over_rpc() {
    let dir = TempDir::new().unwrap();

    let recorded = run_all(&Binding::Local, &FixtureContext::recording(dir.path()));
    assert_all_passed(&recorded);
    assert!(dir.path().join("gas").is_dir());
    assert!(dir.path().join("state_root").is_dir());

    let replay = FixtureContext::replaying(dir.path()).unwrap();
    assert_all_passed(&run_all(&Binding::LoopbackRpc, &replay));
}

#[test]
fn test_tampered_gas_fixture_is_a_conformance_failure() {
    setup();
    let dir = TempDir::new().unwrap();
    let name = "message_application::value_transfer";

    let outcome = run_scenario(
        &ValueTransfer,
        &Binding::Local,
        &FixtureContext::recording(dir.path()),
        name,
    )
    .unwrap();
    assert_eq!(outcome, ScenarioOutcome::Passed);

    let path = FixtureWriter::new(dir.path()).path(FixtureChannel::Gas, name);
    let mut file: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let recorded = file["values"][0].as_i64().unwrap();
    file["values"][0] = serde_json::json!(recorded + 1);
    fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();

    let replay = FixtureContext::replaying(dir.path()).unwrap();
    let err = run_scenario(&ValueTransfer, &Binding::Local, &replay, name).unwrap_err();
    assert_eq!(FailureKind::classify(&err), FailureKind::Conformance);
    assert!(format!("{:#}", err).contains("gas used"));
}

#[test]
fn test_failed_run_does_not_record() {
    setup();
    let dir = TempDir::new().unwrap();
    let binding = Binding::Rpc {
        endpoint: "http://127.0.0.1:1".to_string(),
        timeout: Duration::from_millis(200),
    };

    let err = run_scenario(
        &ValueTransfer,
        &binding,
        &FixtureContext::recording(dir.path()),
        "message_application::value_transfer",
    )
    .unwrap_err();
    assert_eq!(FailureKind::classify(&err), FailureKind::Transport);
    assert!(!dir.path().join("gas").exists());
}

#[test]
fn test_disabled_suite_is_skipped() {
    setup();
    let config = ValidationConfig {
        test_suites: vec!["message_application".to_string()],
        ..ValidationConfig::default()
    };
    let server = RpcServer::spawn(
        "127.0.0.1:0".parse().unwrap(),
        MachineService::new(SandboxMachine::new),
        config,
    )
    .unwrap();
    let binding = Binding::Rpc {
        endpoint: server.endpoint(),
        timeout: Duration::from_secs(10),
    };

    let skipped = run_scenario(
        &DedupAcrossBlocks,
        &binding,
        &FixtureContext::disabled(),
        "tipset::dedup_across_blocks",
    )
    .unwrap();
    assert_eq!(skipped, ScenarioOutcome::Skipped);

    let ran = run_scenario(
        &ValueTransfer,
        &binding,
        &FixtureContext::disabled(),
        "message_application::value_transfer",
    )
    .unwrap();
    assert_eq!(ran, ScenarioOutcome::Passed);
}
