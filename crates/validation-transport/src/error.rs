//! Errors raised while driving a remote VM.

use std::fmt;

use crate::protocol::{FaultKind, RpcFault};

/// Failure of one RPC call.
///
/// Everything except [`RpcError::Remote`] means the SUT was never
/// exercised: the test must stop as a setup failure and never compare the
/// call against a fixture. `Remote` carries an error the SUT itself
/// returned and is propagated to the scenario unchanged.
#[derive(Debug)]
pub enum RpcError {
    /// The connection could not be established.
    Connect { endpoint: String, message: String },
    /// The connection broke after it was established (reset, closed
    /// before a full reply, garbled HTTP framing).
    Disconnected { method: String, message: String },
    /// No reply arrived within the caller-supplied timeout.
    Timeout { method: String, message: String },
    /// The server answered with a non-success HTTP status.
    Http {
        method: String,
        status: u16,
        body: String,
    },
    /// The reply body could not be decoded into the expected shape.
    Decode { method: String, message: String },
    /// The server rejected the call itself (unknown method, bad params).
    Protocol { method: String, fault: RpcFault },
    /// The SUT returned an error while handling the call.
    Remote { method: String, message: String },
}

impl RpcError {
    pub fn is_transport(&self) -> bool {
        !matches!(self, RpcError::Remote { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }

    pub(crate) fn from_fault(method: &str, fault: RpcFault) -> Self {
        match fault.kind {
            FaultKind::Backend => RpcError::Remote {
                method: method.to_string(),
                message: fault.message,
            },
            _ => RpcError::Protocol {
                method: method.to_string(),
                fault,
            },
        }
    }

    pub(crate) fn from_ureq(endpoint: &str, method: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => RpcError::Http {
                method: method.to_string(),
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => {
                let message = transport.to_string();
                if transport_timed_out(&transport) {
                    RpcError::Timeout {
                        method: method.to_string(),
                        message,
                    }
                } else if matches!(
                    transport.kind(),
                    ureq::ErrorKind::ConnectionFailed
                        | ureq::ErrorKind::Dns
                        | ureq::ErrorKind::InvalidUrl
                        | ureq::ErrorKind::UnknownScheme
                ) {
                    RpcError::Connect {
                        endpoint: endpoint.to_string(),
                        message,
                    }
                } else {
                    RpcError::Disconnected {
                        method: method.to_string(),
                        message,
                    }
                }
            }
        }
    }
}

fn transport_timed_out(transport: &ureq::Transport) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> =
        std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    let text = transport.to_string().to_lowercase();
    text.contains("timed out") || text.contains("timeout")
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Connect { endpoint, message } => {
                write!(f, "RPC connect to {} failed: {}", endpoint, message)
            }
            RpcError::Disconnected { method, message } => {
                write!(f, "RPC {} lost its connection: {}", method, message)
            }
            RpcError::Timeout { method, message } => {
                write!(f, "RPC {} timed out: {}", method, message)
            }
            RpcError::Http {
                method,
                status,
                body,
            } => write!(f, "RPC {} returned HTTP {}: {}", method, status, body),
            RpcError::Decode { method, message } => {
                write!(f, "RPC {} reply malformed: {}", method, message)
            }
            RpcError::Protocol { method, fault } => {
                write!(f, "RPC {} rejected: {}", method, fault)
            }
            RpcError::Remote { method, message } => {
                write!(f, "VM error in {}: {}", method, message)
            }
        }
    }
}

impl std::error::Error for RpcError {}
