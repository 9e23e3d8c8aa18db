//! Persistent client for a single ledgerd endpoint.
//!
//! The connection is established lazily on first use and reused across
//! calls until it is explicitly closed or invalidated by the router after
//! a transport failure. State transitions (connect, close, the connected
//! check) are serialized by one async mutex; a call in flight races its
//! reply against the per-call timeout and the closed signal.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::TcpConfig;
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::tls::TlsOptions;

struct EndpointState {
    conn: Option<Arc<Connection>>,
    // Fires once per connection generation; replaced on reconnect.
    closed: CancellationToken,
}

/// Long-lived client for one fixed `host:port` endpoint.
pub struct EndpointClient {
    address: String,
    timeout: Duration,
    tcp: TcpConfig,
    tls: TlsOptions,
    state: Mutex<EndpointState>,
}

impl EndpointClient {
    /// Creates a client in the disconnected state; no dial happens here.
    pub fn new(address: String, timeout: Duration, tcp: TcpConfig, tls: TlsOptions) -> Self {
        Self {
            address,
            timeout,
            tcp,
            tls,
            state: Mutex::new(EndpointState {
                conn: None,
                closed: CancellationToken::new(),
            }),
        }
    }

    /// The endpoint address this client dials.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Issues one call and waits for the first of: reply, close, timeout.
    ///
    /// Dial failure maps to [`ClientError::ConnectionUnestablished`]; a
    /// concurrent [`close`](Self::close) maps to
    /// [`ClientError::ConnectionClosed`]; an elapsed timeout maps to
    /// [`ClientError::RequestTimeout`]. A timed-out or closed-over call is
    /// abandoned client-side only; the server may still apply it.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.connect().await?;

        // Snapshot the connection and its closed signal; a close racing
        // in between is observed here as an already-empty slot.
        let (conn, closed) = {
            let state = self.state.lock().await;
            match &state.conn {
                Some(conn) => (Arc::clone(conn), state.closed.clone()),
                None => return Err(ClientError::ConnectionClosed),
            }
        };

        let (id, rx) = conn.start_call(method, params).await?;

        tokio::select! {
            reply = rx => match reply {
                Ok(response) => response.into_result(),
                // Reader stopped and dropped the pending entry.
                Err(_) => Err(ClientError::ConnectionReset),
            },
            _ = closed.cancelled() => {
                conn.forget(id).await;
                Err(ClientError::ConnectionClosed)
            }
            _ = tokio::time::sleep(self.timeout) => {
                conn.forget(id).await;
                Err(ClientError::RequestTimeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Establishes the connection if there is none.
    ///
    /// Only one dial proceeds at a time; concurrent callers wait on the
    /// state mutex and observe the outcome of the in-flight attempt. A
    /// successful dial installs a fresh closed signal superseding the one
    /// fired by any previous close.
    pub async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.conn.is_some() {
            return Ok(());
        }

        let conn = Connection::dial(&self.address, &self.tcp, &self.tls)
            .await
            .map_err(|e| ClientError::ConnectionUnestablished {
                addr: self.address.clone(),
                reason: e.to_string(),
            })?;

        state.conn = Some(Arc::new(conn));
        state.closed = CancellationToken::new();
        Ok(())
    }

    /// Closes the current connection and unblocks every waiting call.
    ///
    /// Idempotent: closing a disconnected client is a no-op. The next call
    /// after a close dials afresh.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.conn.is_none() {
            return;
        }

        state.closed.cancel();
        if let Some(conn) = state.conn.take() {
            debug!(addr = %conn.peer_addr(), "endpoint closed");
        }
    }
}

impl std::fmt::Debug for EndpointClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointClient")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .finish()
    }
}
