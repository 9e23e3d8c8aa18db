//! Multi-endpoint router: round-robin selection and connection invalidation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::endpoint::EndpointClient;
use crate::error::{ClientError, Result};

/// Client for a set of equivalent ledgerd endpoints.
///
/// Holds one [`EndpointClient`] per configured address and spreads calls
/// across them with a shared round-robin cursor. No call is retried
/// automatically; after a transport-level failure the affected endpoint's
/// connection is closed so its next use dials afresh, and the error is
/// returned to the caller, who decides whether to reissue.
pub struct LedgerClient {
    addresses: Vec<String>,
    clients: HashMap<String, EndpointClient>,
    counter: AtomicU64,
}

impl LedgerClient {
    /// Builds one endpoint client per address; no connection is dialed
    /// until the first call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.addresses.is_empty() {
            return Err(ClientError::Config {
                reason: "at least one endpoint address is required".to_string(),
            });
        }
        config.tls.validate()?;

        let clients = config
            .addresses
            .iter()
            .map(|addr| {
                (
                    addr.clone(),
                    EndpointClient::new(
                        addr.clone(),
                        config.call_timeout,
                        config.tcp.clone(),
                        config.tls.clone(),
                    ),
                )
            })
            .collect();

        Ok(Self {
            addresses: config.addresses,
            clients,
            counter: AtomicU64::new(0),
        })
    }

    /// Picks the next endpoint client in round-robin order.
    ///
    /// Every caller observes a distinct cursor value before the modulo, so
    /// consecutive calls walk the address list in order regardless of any
    /// endpoint's health.
    fn pick(&self) -> &EndpointClient {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let index = counter as usize % self.addresses.len();
        &self.clients[&self.addresses[index]]
    }

    /// Issues `method` with `params` against the next endpoint in rotation.
    ///
    /// This is the generic primitive every typed wrapper delegates to; the
    /// raw reply payload is returned undecoded.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let client = self.pick();
        match client.call(method, params).await {
            Err(err) if err.is_connection_fatal() => {
                debug!(
                    addr = %client.address(),
                    error = %err,
                    "invalidating connection after transport failure"
                );
                client.close().await;
                Err(err)
            }
            other => other,
        }
    }

    /// Closes every endpoint client. Idempotent; safe to call twice.
    pub async fn close(&self) {
        for client in self.clients.values() {
            client.close().await;
        }
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("addresses", &self.addresses)
            .field("counter", &self.counter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::TlsOptions;
    use std::time::Duration;

    fn test_config(addresses: Vec<String>) -> ClientConfig {
        ClientConfig::new(
            addresses,
            Duration::from_secs(1),
            TlsOptions {
                danger_accept_invalid_certs: true,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_empty_addresses_rejected() {
        match LedgerClient::new(test_config(vec![])) {
            Err(ClientError::Config { .. }) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_insecure_config_rejected() {
        let config = ClientConfig::new(
            vec!["127.0.0.1:2130".into()],
            Duration::from_secs(1),
            TlsOptions::default(),
        );
        assert!(LedgerClient::new(config).is_err());
    }

    #[test]
    fn test_round_robin_order() {
        let client = LedgerClient::new(test_config(vec![
            "a:1".into(),
            "b:1".into(),
            "c:1".into(),
        ]))
        .unwrap();

        // Cursor starts at 0 and increments before the modulo, so the
        // first pick lands on index 1.
        let picks: Vec<&str> = (0..7).map(|_| client.pick().address()).collect();
        assert_eq!(picks, vec!["b:1", "c:1", "a:1", "b:1", "c:1", "a:1", "b:1"]);
    }

    #[test]
    fn test_single_address_always_picked() {
        let client = LedgerClient::new(test_config(vec!["a:1".into()])).unwrap();
        for _ in 0..5 {
            assert_eq!(client.pick().address(), "a:1");
        }
    }

    #[test]
    fn test_clients_cover_addresses() {
        let client =
            LedgerClient::new(test_config(vec!["a:1".into(), "b:1".into()])).unwrap();
        assert_eq!(client.clients.len(), 2);
        assert!(client.clients.contains_key("a:1"));
        assert!(client.clients.contains_key("b:1"));
    }
}
