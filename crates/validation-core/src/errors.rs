//! Harness error taxonomy.
//!
//! Errors travel as `anyhow::Error`. The typed errors below (and
//! [`RpcError`] from the transport crate) are recovered with
//! `downcast_ref` to decide what kind of failure a test hit.

use std::fmt;

use chain_validation_transport::RpcError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// The harness could not set up or drive the test. The SUT's
    /// correctness was never exercised.
    Setup(String),
    /// SUT output differs from the expected literal or fixture value.
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },
}

impl HarnessError {
    pub fn setup(message: impl Into<String>) -> Self {
        HarnessError::Setup(message.into())
    }

    pub fn mismatch(
        what: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        HarnessError::Mismatch {
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Setup(message) => write!(f, "test setup failed: {}", message),
            HarnessError::Mismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "conformance mismatch in {}: expected {}, got {}",
                what, expected, actual
            ),
        }
    }
}

impl std::error::Error for HarnessError {}

/// Which bucket a failed test falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, timeout or HTTP failure talking to the SUT.
    Transport,
    /// Harness problem: malformed reply, protocol misuse, bad setup.
    Setup,
    /// The SUT ran and produced the wrong output.
    Conformance,
    /// The SUT reported an error instead of a receipt.
    Sut,
}

impl FailureKind {
    pub fn classify(err: &anyhow::Error) -> FailureKind {
        for cause in err.chain() {
            if let Some(harness) = cause.downcast_ref::<HarnessError>() {
                return match harness {
                    HarnessError::Setup(_) => FailureKind::Setup,
                    HarnessError::Mismatch { .. } => FailureKind::Conformance,
                };
            }
            if let Some(rpc) = cause.downcast_ref::<RpcError>() {
                return match rpc {
                    RpcError::Remote { .. } => FailureKind::Sut,
                    RpcError::Decode { .. } | RpcError::Protocol { .. } => FailureKind::Setup,
                    RpcError::Connect { .. }
                    | RpcError::Disconnected { .. }
                    | RpcError::Timeout { .. }
                    | RpcError::Http { .. } => FailureKind::Transport,
                };
            }
        }
        FailureKind::Sut
    }

    /// True when the SUT's behaviour was actually checked.
    pub fn exercised_sut(self) -> bool {
        matches!(self, FailureKind::Conformance | FailureKind::Sut)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Transport => "transport",
            FailureKind::Setup => "setup",
            FailureKind::Conformance => "conformance",
            FailureKind::Sut => "sut",
        })
    }
}
