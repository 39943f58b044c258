//! Harness configuration from environment variables.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chain_validation_types::env::{self, env_string_or, env_var_or};

use crate::fixtures::FixtureMode;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 8378;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FIXTURE_ROOT: &str = "fixtures";

/// Which applier the tests drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingKind {
    #[default]
    Local,
    Rpc,
}

impl FromStr for BindingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "in-process" => Ok(BindingKind::Local),
            "rpc" | "remote" => Ok(BindingKind::Rpc),
            other => bail!("unknown binding '{}' (expected local or rpc)", other),
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingKind::Local => "local",
            BindingKind::Rpc => "rpc",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub rpc_host: String,
    pub rpc_port: u16,
    pub rpc_timeout: Duration,
    pub fixture_root: PathBuf,
    pub fixture_mode: FixtureMode,
    pub binding: BindingKind,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rpc_host: DEFAULT_RPC_HOST.to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            fixture_root: PathBuf::from(DEFAULT_FIXTURE_ROOT),
            fixture_mode: FixtureMode::default(),
            binding: BindingKind::default(),
        }
    }
}

impl HarnessConfig {
    /// Read every `CHAIN_VALIDATION_*` variable, falling back to defaults.
    ///
    /// Numeric values that fail to parse fall back silently; an unknown
    /// fixture mode or binding is an error.
    pub fn from_env() -> Result<Self> {
        let fixture_mode = env_string_or(env::FIXTURE_MODE, "replay")
            .parse()
            .with_context(|| format!("invalid {}", env::FIXTURE_MODE))?;
        let binding = env_string_or(env::BINDING, "local")
            .parse()
            .with_context(|| format!("invalid {}", env::BINDING))?;

        Ok(Self {
            rpc_host: env_string_or(env::RPC_HOST, DEFAULT_RPC_HOST),
            rpc_port: env_var_or(env::RPC_PORT, DEFAULT_RPC_PORT),
            rpc_timeout: Duration::from_millis(env_var_or(
                env::RPC_TIMEOUT_MS,
                DEFAULT_RPC_TIMEOUT_MS,
            )),
            fixture_root: PathBuf::from(env_string_or(env::FIXTURE_ROOT, DEFAULT_FIXTURE_ROOT)),
            fixture_mode,
            binding,
        })
    }

    /// `http://host:port`
    pub fn rpc_endpoint(&self) -> String {
        format!("http://{}:{}", self.rpc_host, self.rpc_port)
    }
}
