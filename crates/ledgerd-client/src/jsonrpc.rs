//! Wire types for the line-delimited JSON-RPC convention ledgerd speaks.
//!
//! One JSON object per line. Requests carry `{method, params, id}` with
//! `params` a single-element array; responses carry `{result, error, id}`
//! with `error` a string or null.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// A single request line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Remote `Service.Method` name.
    pub method: String,
    /// Single-element argument array.
    pub params: [Value; 1],
    /// Connection-scoped request identifier.
    pub id: u64,
}

impl Request {
    /// Builds a request for `method` with the given argument value.
    pub fn new(method: &str, params: Value, id: u64) -> Self {
        Self {
            method: method.to_string(),
            params: [params],
            id,
        }
    }
}

/// A single response line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Result value; null/absent on error.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error string; null/absent on success.
    #[serde(default)]
    pub error: Option<Value>,
    /// Identifier of the request this answers.
    pub id: u64,
}

impl Response {
    /// Builds a success response (used by test servers).
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            result: Some(result),
            error: Some(Value::Null),
            id,
        }
    }

    /// Builds an error response carrying a message string.
    pub fn failure(id: u64, message: &str) -> Self {
        Self {
            result: Some(Value::Null),
            error: Some(Value::String(message.to_string())),
            id,
        }
    }

    /// Collapses the `{result, error}` pair into a client result.
    ///
    /// A non-null `error` wins and is passed through verbatim as
    /// [`ClientError::Remote`].
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            None | Some(Value::Null) => Ok(self.result.unwrap_or(Value::Null)),
            Some(Value::String(message)) => Err(ClientError::Remote(message)),
            Some(other) => Err(ClientError::Remote(other.to_string())),
        }
    }
}
