use anyhow::Result;
use tracing::info;

use chain_validation_types::Cid;

use super::store::{FixtureEntry, FixtureWriter};

/// In-memory capture of one test's observations, in call order.
#[derive(Debug, Clone)]
pub struct FixtureRecorder {
    test_name: String,
    entry: FixtureEntry,
}

impl FixtureRecorder {
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            entry: FixtureEntry::default(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn record(&mut self, gas_used: i64, root: Cid) {
        self.entry.gas.push(gas_used);
        self.entry.state_roots.push(root);
    }

    pub fn entry(&self) -> &FixtureEntry {
        &self.entry
    }

    pub fn len(&self) -> usize {
        self.entry.gas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.gas.is_empty()
    }

    /// Persist everything captured as this test's fixture.
    pub fn finish(&self, writer: &FixtureWriter) -> Result<()> {
        writer.write(&self.test_name, &self.entry)?;
        info!(test = %self.test_name, observations = self.len(), "recorded fixture");
        Ok(())
    }
}
