//! sandbox-rpc-server: serve the reference sandbox machine over the RPC
//! driving protocol.
//!
//! ```bash
//! # Default endpoint (CHAIN_VALIDATION_RPC_HOST / CHAIN_VALIDATION_RPC_PORT)
//! sandbox-rpc-server
//!
//! # Only run the tipset suite, and do not compare gas
//! sandbox-rpc-server --suite tipset --no-check-gas
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chain_validation::suite_names;
use chain_validation_core::config::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use chain_validation_core::logging::init_logging;
use chain_validation_core::{MachineService, SandboxMachine, ValidationConfig};
use chain_validation_types::env::{self, env_string_or, env_var_or};

#[derive(Parser)]
#[command(
    name = "sandbox-rpc-server",
    version,
    about = "Serve the sandbox VM over the validation RPC protocol"
)]
struct Cli {
    /// Host to bind (default: CHAIN_VALIDATION_RPC_HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (default: CHAIN_VALIDATION_RPC_PORT or 8378)
    #[arg(long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Report gas as unchecked in the validation config
    #[arg(long)]
    no_check_gas: bool,

    #[arg(long)]
    no_check_exit_code: bool,

    #[arg(long)]
    no_check_return_value: bool,

    #[arg(long)]
    no_check_state_root: bool,

    /// Restrict the run to these suites (repeatable; default: all)
    #[arg(long = "suite", value_name = "NAME")]
    suites: Vec<String>,
}

impl Cli {
    fn validation_config(&self) -> Result<ValidationConfig> {
        let known = suite_names();
        if let Some(unknown) = self.suites.iter().find(|s| !known.contains(&s.as_str())) {
            anyhow::bail!("unknown suite '{}' (known: {})", unknown, known.join(", "));
        }
        Ok(ValidationConfig {
            check_gas: !self.no_check_gas,
            check_exit_code: !self.no_check_exit_code,
            check_return_value: !self.no_check_return_value,
            check_state_root: !self.no_check_state_root,
            test_suites: self.suites.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.validation_config()?;
    let host = cli
        .host
        .clone()
        .unwrap_or_else(|| env_string_or(env::RPC_HOST, DEFAULT_RPC_HOST));
    let port = cli
        .port
        .unwrap_or_else(|| env_var_or(env::RPC_PORT, DEFAULT_RPC_PORT));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    info!(?config, "serving sandbox machine");

    chain_validation_transport::serve(
        listener,
        MachineService::new(SandboxMachine::new),
        config,
        async {
            let _ = tokio::signal::ctrl_c().await;
            info!("ctrl-c received, shutting down");
        },
    )
    .await
}
