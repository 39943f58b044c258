#![allow(dead_code)]
//! Shared helpers for the scenario integration tests.

use chain_validation::{
    run_scenario, visit_all, Binding, FixtureContext, Scenario, ScenarioOutcome, SuiteRunner,
};
use chain_validation_core::logging::init_test_logging;

pub fn setup() {
    init_test_logging();
}

/// Run one scenario without fixtures and fail the test on any error.
pub fn run_plain<S: Scenario>(scenario: &S, binding: &Binding) -> ScenarioOutcome {
    setup();
    let test_name = format!("{}::{}", scenario.suite(), scenario.name());
    match run_scenario(scenario, binding, &FixtureContext::disabled(), &test_name) {
        Ok(outcome) => outcome,
        Err(e) => panic!("{} failed: {:#}", test_name, e),
    }
}

/// Run every scenario and return `(name, outcome)` pairs with errors
/// rendered to strings.
pub fn run_all(
    binding: &Binding,
    fixtures: &FixtureContext,
) -> Vec<(&'static str, Result<ScenarioOutcome, String>)> {
    setup();
    let mut runner = SuiteRunner::new(binding, fixtures);
    visit_all(&mut runner);
    runner
        .outcomes
        .into_iter()
        .map(|(name, outcome)| (name, outcome.map_err(|e| format!("{:#}", e))))
        .collect()
}

pub fn assert_all_passed(outcomes: &[(&'static str, Result<ScenarioOutcome, String>)]) {
    for (name, outcome) in outcomes {
        match outcome {
            Ok(ScenarioOutcome::Passed) => {}
            other => panic!("scenario {} did not pass: {:?}", name, other),
        }
    }
}
