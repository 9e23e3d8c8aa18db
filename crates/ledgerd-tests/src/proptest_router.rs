//! Property-based tests for round-robin selection fairness.
//!
//! Models the router's cursor arithmetic (atomic increment, then modulo
//! over the fixed address list) and checks the fairness and ordering
//! guarantees hold for arbitrary cursor starts and list sizes.
