//! Recording a test's observations and replaying them.

use std::sync::Arc;
use tempfile::TempDir;

use chain_validation_core::fixtures::{FixtureRecorder, FixtureReplayer};
use chain_validation_core::{FixtureCheck, FixtureMode, FixtureOracle, FixtureStore, FixtureWriter};
use chain_validation_types::Cid;

#[test]
fn test_gas_sequence_round_trips_then_runs_out() {
    let dir = TempDir::new().unwrap();
    let writer = FixtureWriter::new(dir.path());

    let mut recorder = FixtureRecorder::new("T1");
    recorder.record(130, Cid::new("root-1"));
    recorder.record(268, Cid::new("root-2"));
    recorder.finish(&writer).unwrap();

    let store = Arc::new(FixtureStore::load(dir.path()).unwrap());
    let mut replayer = FixtureReplayer::new(store, "T1");
    assert_eq!(replayer.next_expected_gas(), Some(130));
    assert_eq!(replayer.next_expected_gas(), Some(268));
    assert_eq!(replayer.next_expected_gas(), None);

    assert_eq!(replayer.next_expected_root(), Some(Cid::new("root-1")));
    assert_eq!(replayer.next_expected_root(), Some(Cid::new("root-2")));
    assert_eq!(replayer.next_expected_root(), None);
}

#[test]
fn test_oracle_modes_share_layout() {
    let dir = TempDir::new().unwrap();
    let empty = Arc::new(FixtureStore::empty());

    let mut recording =
        FixtureOracle::for_mode(FixtureMode::Record, empty.clone(), dir.path(), "mod::case");
    let observations = [(10, "a"), (20, "b"), (30, "c")];
    for (gas, root) in observations {
        recording.observe(gas, &Cid::new(root));
    }
    recording.finish().unwrap();

    let store = Arc::new(FixtureStore::load(dir.path()).unwrap());
    let mut replaying = FixtureOracle::for_mode(FixtureMode::Replay, store, dir.path(), "mod::case");
    for (gas, root) in observations {
        let obs = replaying.observe(gas, &Cid::new(root));
        assert_eq!(obs.gas, FixtureCheck::Matched);
        assert_eq!(obs.root, FixtureCheck::Matched);
    }

    let off = FixtureOracle::for_mode(FixtureMode::Off, empty, dir.path(), "mod::case");
    assert_eq!(off.mode(), FixtureMode::Off);
}
