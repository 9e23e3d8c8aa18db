//! Test and validation infrastructure for the ledgerd client.
//!
//! Provides an in-process mock ledgerd node (TLS, line-delimited JSON-RPC)
//! and resilience suites exercising the client against live sockets:
//! round-robin fairness, lazy connect, timeout abandonment, close racing,
//! reconnect after invalidation.

pub mod harness;

mod client_resilience;
mod proptest_router;

pub use harness::{init_logging, MockNode, NodeHandler, TestCa};
