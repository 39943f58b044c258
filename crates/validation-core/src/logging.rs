//! Tracing subscriber setup.
//!
//! `RUST_LOG` always wins over the level passed in.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Install a stderr subscriber for binaries. Safe to call more than once.
pub fn init_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Install a subscriber whose output libtest captures per test.
///
/// Defaults to `warn` so missing-fixture warnings show up on failures.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter("warn"))
            .with_test_writer()
            .with_target(false)
            .try_init();
    });
}
