//! Construction configuration for the client.

use std::time::Duration;

use crate::tls::TlsOptions;

/// TCP dial configuration.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Dial timeout (default: 5 seconds).
    pub connect_timeout: Duration,
    /// Whether to enable TCP_NODELAY (disable Nagle's algorithm).
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            nodelay: true,
        }
    }
}

/// Configuration for a [`LedgerClient`](crate::LedgerClient).
///
/// `addresses` is the fixed, ordered set of equivalent ledgerd endpoints;
/// calls are spread across them round-robin. `call_timeout` is the per-call
/// budget applied uniformly to every endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Ordered `host:port` endpoint addresses, one client per entry.
    pub addresses: Vec<String>,
    /// Per-call reply budget.
    pub call_timeout: Duration,
    /// TCP dial options.
    pub tcp: TcpConfig,
    /// TLS options; peer verification is on unless explicitly disabled.
    pub tls: TlsOptions,
}

impl ClientConfig {
    /// Creates a configuration for the given endpoints with default
    /// TCP options and the given per-call timeout.
    pub fn new(addresses: Vec<String>, call_timeout: Duration, tls: TlsOptions) -> Self {
        Self {
            addresses,
            call_timeout,
            tcp: TcpConfig::default(),
            tls,
        }
    }
}
