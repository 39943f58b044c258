//! Golden fixtures for gas used and state roots.
//!
//! A fixture is the ordered list of `(gas_used, state_root)` pairs observed
//! during a passing run of one test. Entries are keyed by position only:
//! the n-th apply of a test is compared with the n-th recorded pair, so
//! reordering the applies of a test invalidates its fixture.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── gas/<SanitizedTestName>.json
//! └── state_root/<SanitizedTestName>.json
//! ```
//!
//! Each file holds `{"test": ..., "recorded_at": ..., "values": [...]}`.
//!
//! Fixtures are recorded or replayed, never both in one run. The
//! [`FixtureStore`] is loaded once before the tests run and is read-only
//! afterwards; recordings are written whole by [`FixtureWriter`].

mod oracle;
mod recorder;
mod replayer;
mod store;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use oracle::{FixtureCheck, FixtureOracle, Observation};
pub use recorder::FixtureRecorder;
pub use replayer::FixtureReplayer;
pub use store::{FixtureEntry, FixtureStore, FixtureWriter};

/// Keep ASCII letters and digits only.
///
/// `my_crate::suite::test_transfer` becomes `mycratesuitetesttransfer`.
pub fn sanitize_test_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// One observable stream stored per test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureChannel {
    Gas,
    StateRoot,
}

impl FixtureChannel {
    pub const ALL: [FixtureChannel; 2] = [FixtureChannel::Gas, FixtureChannel::StateRoot];

    /// Directory under the fixture root.
    pub fn dir_name(self) -> &'static str {
        match self {
            FixtureChannel::Gas => "gas",
            FixtureChannel::StateRoot => "state_root",
        }
    }
}

impl fmt::Display for FixtureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// On-disk body of one channel file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureFile<T> {
    pub test: String,
    pub recorded_at: DateTime<Utc>,
    pub values: Vec<T>,
}

/// What the oracle does for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixtureMode {
    Off,
    Record,
    #[default]
    Replay,
}

impl FromStr for FixtureMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "disabled" => Ok(FixtureMode::Off),
            "record" => Ok(FixtureMode::Record),
            "replay" => Ok(FixtureMode::Replay),
            other => bail!("unknown fixture mode '{}' (expected off, record or replay)", other),
        }
    }
}

impl fmt::Display for FixtureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureMode::Off => "off",
            FixtureMode::Record => "record",
            FixtureMode::Replay => "replay",
        })
    }
}
