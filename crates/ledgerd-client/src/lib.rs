#![warn(missing_docs)]

//! Resilient JSON-RPC-over-TLS client for ledgerd nodes.
//!
//! Maintains one lazily-established, long-lived connection per configured
//! endpoint and spreads calls across endpoints round-robin. Every call runs
//! under a per-call timeout; a connection that fails mid-call is invalidated
//! so the next use reconnects.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod jsonrpc;
pub mod records;
pub mod router;
pub mod tls;

mod api;
mod connection;

pub use config::{ClientConfig, TcpConfig};
pub use endpoint::EndpointClient;
pub use error::{ClientError, Result};
pub use router::LedgerClient;
pub use tls::TlsOptions;
