//! Validation Transport Layer
//!
//! RPC driving protocol for systems under test that cannot be linked into
//! the test binary. The protocol is synchronous request/reply: JSON bodies
//! over HTTP POST, one call per connection, with a caller-supplied timeout.
//!
//! This crate provides:
//! - [`protocol`]: method names and request/reply shapes
//! - [`client`]: [`RpcClient`], the blocking client used by the harness
//! - [`server`]: [`RpcServer`] and the [`RpcBackend`] seam a SUT implements
//! - [`error`]: [`RpcError`], separating transport failures from VM errors
//!
//! # Example
//!
//! ```ignore
//! use chain_validation_transport::{RpcClient, RpcServer};
//!
//! let server = RpcServer::spawn("127.0.0.1:0".parse()?, backend, ValidationConfig::default())?;
//! let client = RpcClient::new(&server.endpoint(), Duration::from_secs(5));
//! client.new_vm(None)?;
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::RpcClient;
pub use error::RpcError;
pub use server::{serve, RpcBackend, RpcServer};
