use std::sync::Arc;

use chain_validation_types::Cid;

use super::store::FixtureStore;

/// Positional reader over one test's fixture.
///
/// Each channel has its own cursor. Cursors only move forward; once a
/// channel is exhausted (or the test has no fixture) every further call
/// returns `None`.
#[derive(Debug, Clone)]
pub struct FixtureReplayer {
    store: Arc<FixtureStore>,
    test_name: String,
    gas_cursor: usize,
    root_cursor: usize,
}

impl FixtureReplayer {
    pub fn new(store: Arc<FixtureStore>, test_name: impl Into<String>) -> Self {
        Self {
            store,
            test_name: test_name.into(),
            gas_cursor: 0,
            root_cursor: 0,
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn has_fixture(&self) -> bool {
        self.store.get(&self.test_name).is_some()
    }

    pub fn next_expected_gas(&mut self) -> Option<i64> {
        let value = self
            .store
            .get(&self.test_name)?
            .gas
            .get(self.gas_cursor)
            .copied();
        self.gas_cursor += 1;
        value
    }

    pub fn next_expected_root(&mut self) -> Option<Cid> {
        let value = self
            .store
            .get(&self.test_name)?
            .state_roots
            .get(self.root_cursor)
            .cloned();
        self.root_cursor += 1;
        value
    }
}
