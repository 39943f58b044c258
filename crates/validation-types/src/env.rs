//! Environment variable parsing for harness configuration.
//!
//! All harness settings share the `CHAIN_VALIDATION_` prefix. The helpers
//! here fall back to a default whenever a variable is unset or unparsable,
//! so a misconfigured variable never aborts the suite before it starts.
//!
//! ```
//! use chain_validation_types::env::{env_var_or, env_bool_or};
//!
//! let timeout_ms: u64 = env_var_or("CHAIN_VALIDATION_RPC_TIMEOUT_MS", 30_000);
//! let verbose = env_bool_or("CHAIN_VALIDATION_VERBOSE", false);
//! ```

use std::str::FromStr;

pub const RPC_HOST: &str = "CHAIN_VALIDATION_RPC_HOST";
pub const RPC_PORT: &str = "CHAIN_VALIDATION_RPC_PORT";
pub const RPC_TIMEOUT_MS: &str = "CHAIN_VALIDATION_RPC_TIMEOUT_MS";
pub const FIXTURE_ROOT: &str = "CHAIN_VALIDATION_FIXTURE_ROOT";
pub const FIXTURE_MODE: &str = "CHAIN_VALIDATION_FIXTURE_MODE";
pub const BINDING: &str = "CHAIN_VALIDATION_BINDING";

/// Parse an environment variable into any `FromStr` type.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Truthy values are "1", "true", "yes" and "on" (case-insensitive).
pub fn env_bool_or(key: &str, default: bool) -> bool {
    match std::env::var(key).ok() {
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

pub fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Comma-separated list; empty entries are dropped.
pub fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or() {
        std::env::set_var("CV_TEST_PORT", " 9000 ");
        assert_eq!(env_var_or::<u16>("CV_TEST_PORT", 1), 9000);
        std::env::set_var("CV_TEST_PORT", "not-a-port");
        assert_eq!(env_var_or::<u16>("CV_TEST_PORT", 1), 1);
        std::env::remove_var("CV_TEST_PORT");
        assert_eq!(env_var_or::<u16>("CV_TEST_PORT", 7), 7);
    }

    #[test]
    fn test_env_bool_or() {
        std::env::set_var("CV_TEST_BOOL", "YES");
        assert!(env_bool_or("CV_TEST_BOOL", false));
        std::env::set_var("CV_TEST_BOOL", "off");
        assert!(!env_bool_or("CV_TEST_BOOL", true));
        std::env::remove_var("CV_TEST_BOOL");
        assert!(env_bool_or("CV_TEST_BOOL", true));
    }

    #[test]
    fn test_env_string_or_ignores_blank() {
        std::env::set_var("CV_TEST_HOST", "   ");
        assert_eq!(env_string_or("CV_TEST_HOST", "127.0.0.1"), "127.0.0.1");
        std::env::remove_var("CV_TEST_HOST");
    }

    #[test]
    fn test_env_list() {
        std::env::set_var("CV_TEST_SUITES", "message_application, ,tipset");
        assert_eq!(env_list("CV_TEST_SUITES"), vec!["message_application", "tipset"]);
        std::env::remove_var("CV_TEST_SUITES");
        assert!(env_list("CV_TEST_SUITES").is_empty());
    }
}
