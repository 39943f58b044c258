use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use chain_validation_types::Cid;

use super::recorder::FixtureRecorder;
use super::replayer::FixtureReplayer;
use super::store::{FixtureStore, FixtureWriter};
use super::{FixtureChannel, FixtureMode};

/// Result of comparing one observed value against the fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureCheck<T> {
    /// Oracle is off.
    Skipped,
    Recorded,
    Matched,
    /// No fixture value at this position. Not a failure.
    Missing,
    Mismatch { expected: T, actual: T },
}

impl<T> FixtureCheck<T> {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, FixtureCheck::Mismatch { .. })
    }
}

/// Both channel checks for one apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub gas: FixtureCheck<i64>,
    pub root: FixtureCheck<Cid>,
}

/// Per-test fixture oracle. Records or replays, never both.
#[derive(Debug)]
pub enum FixtureOracle {
    Disabled,
    Recording {
        recorder: FixtureRecorder,
        writer: FixtureWriter,
    },
    Replaying(FixtureReplayer),
}

impl FixtureOracle {
    pub fn recording(test_name: impl Into<String>, writer: FixtureWriter) -> Self {
        FixtureOracle::Recording {
            recorder: FixtureRecorder::new(test_name),
            writer,
        }
    }

    pub fn replaying(store: Arc<FixtureStore>, test_name: impl Into<String>) -> Self {
        let replayer = FixtureReplayer::new(store, test_name);
        if !replayer.has_fixture() {
            warn!(test = replayer.test_name(), "no fixture recorded for test");
        }
        FixtureOracle::Replaying(replayer)
    }

    /// Build the oracle for `mode`. The store is only consulted when
    /// replaying; recordings are written under `fixture_root`.
    pub fn for_mode(
        mode: FixtureMode,
        store: Arc<FixtureStore>,
        fixture_root: &std::path::Path,
        test_name: &str,
    ) -> Self {
        match mode {
            FixtureMode::Off => FixtureOracle::Disabled,
            FixtureMode::Record => {
                Self::recording(test_name, FixtureWriter::new(fixture_root))
            }
            FixtureMode::Replay => Self::replaying(store, test_name),
        }
    }

    pub fn mode(&self) -> FixtureMode {
        match self {
            FixtureOracle::Disabled => FixtureMode::Off,
            FixtureOracle::Recording { .. } => FixtureMode::Record,
            FixtureOracle::Replaying(_) => FixtureMode::Replay,
        }
    }

    /// Feed one apply's observation. Advances replay cursors.
    pub fn observe(&mut self, gas_used: i64, root: &Cid) -> Observation {
        match self {
            FixtureOracle::Disabled => Observation {
                gas: FixtureCheck::Skipped,
                root: FixtureCheck::Skipped,
            },
            FixtureOracle::Recording { recorder, .. } => {
                recorder.record(gas_used, root.clone());
                Observation {
                    gas: FixtureCheck::Recorded,
                    root: FixtureCheck::Recorded,
                }
            }
            FixtureOracle::Replaying(replayer) => {
                let test = replayer.test_name().to_string();
                Observation {
                    gas: compare(&test, FixtureChannel::Gas, replayer.next_expected_gas(), gas_used),
                    root: compare(
                        &test,
                        FixtureChannel::StateRoot,
                        replayer.next_expected_root(),
                        root.clone(),
                    ),
                }
            }
        }
    }

    /// Persist a recording. No-op in other modes.
    pub fn finish(&self) -> Result<()> {
        match self {
            FixtureOracle::Recording { recorder, writer } => recorder.finish(writer),
            _ => Ok(()),
        }
    }
}

fn compare<T: PartialEq + std::fmt::Debug>(
    test: &str,
    channel: FixtureChannel,
    expected: Option<T>,
    actual: T,
) -> FixtureCheck<T> {
    match expected {
        None => {
            warn!(test, %channel, actual = ?actual, "fixture value not found, skipping check");
            FixtureCheck::Missing
        }
        Some(expected) if expected == actual => FixtureCheck::Matched,
        Some(expected) => FixtureCheck::Mismatch { expected, actual },
    }
}
