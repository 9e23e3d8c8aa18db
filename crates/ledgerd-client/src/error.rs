use thiserror::Error;

/// Errors surfaced by the ledgerd RPC client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The dial attempt failed; no call was forwarded.
    #[error("connection can not be established to {addr}: {reason}")]
    ConnectionUnestablished {
        /// Endpoint address that could not be dialed.
        addr: String,
        /// Human-readable dial failure.
        reason: String,
    },

    /// The client was closed before or while the call was waiting.
    #[error("rpc connection closed")]
    ConnectionClosed,

    /// The per-call timeout elapsed before a reply arrived.
    ///
    /// The call is abandoned client-side only; the server may still apply
    /// its effects. Non-idempotent operations risk duplicate application
    /// when retried after this error.
    #[error("rpc request timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The configured per-call budget in milliseconds.
        timeout_ms: u64,
    },

    /// The server replied with an application-level error, passed through
    /// verbatim.
    #[error("remote error: {0}")]
    Remote(String),

    /// The connection's reader stopped (peer reset, EOF, or an undecodable
    /// response line) while the call was in flight.
    #[error("connection reset by peer")]
    ConnectionReset,

    /// TCP connect did not complete within the configured dial budget.
    #[error("connection timeout after {timeout_ms}ms to {addr}")]
    ConnectionTimeout {
        /// Endpoint address being dialed.
        addr: String,
        /// The configured dial budget in milliseconds.
        timeout_ms: u64,
    },

    /// TLS configuration or handshake failure.
    #[error("TLS error: {reason}")]
    Tls {
        /// Human-readable TLS failure.
        reason: String,
    },

    /// Invalid construction configuration.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// Request or argument serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A network-level error surfaced by the transport.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether this error invalidates the connection it occurred on.
    ///
    /// The router closes the endpoint client on these so its next use
    /// dials afresh instead of repeating a known-bad call.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::ConnectionReset | ClientError::Tls { .. }
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ClientError>;
