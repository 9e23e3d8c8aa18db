//! Resilience tests for the client against live in-process nodes.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use ledgerd_client::{ClientConfig, ClientError, LedgerClient};
    use serde_json::json;

    use crate::harness::{
        init_logging, EchoHandler, FailingHandler, IdentityHandler, MockNode, SleepHandler,
        TestCa,
    };

    fn config(ca: &TestCa, addresses: Vec<String>, timeout: Duration) -> ClientConfig {
        ClientConfig::new(addresses, timeout, ca.client_tls())
    }

    async fn identity_node(ca: &TestCa, name: &str) -> MockNode {
        MockNode::start(
            ca,
            Arc::new(IdentityHandler {
                payload: json!({ "node": name }),
            }),
        )
        .await
        .expect("mock node should start")
    }

    #[tokio::test]
    async fn test_lazy_connect() {
        let ca = TestCa::new().unwrap();
        let node = identity_node(&ca, "A").await;

        let client = LedgerClient::new(config(
            &ca,
            vec![node.addr().to_string()],
            Duration::from_secs(5),
        ))
        .unwrap();

        // Construction alone must not dial.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(node.accepted_connections(), 0);

        client.node_info().await.unwrap();
        assert_eq!(node.accepted_connections(), 1);

        // The connection is reused, not re-dialed, on the next call.
        client.node_info().await.unwrap();
        assert_eq!(node.accepted_connections(), 1);
    }

    #[tokio::test]
    async fn test_round_robin_two_nodes() {
        init_logging();
        let ca = TestCa::new().unwrap();
        let node_a = identity_node(&ca, "A").await;
        let node_b = identity_node(&ca, "B").await;

        let client = LedgerClient::new(config(
            &ca,
            vec![node_a.addr().to_string(), node_b.addr().to_string()],
            Duration::from_secs(5),
        ))
        .unwrap();

        // Counter starts at 0 and increments before the modulo, so three
        // calls against [A, B] land on B, A, B.
        let first = client.node_info().await.unwrap();
        let second = client.node_info().await.unwrap();
        let third = client.node_info().await.unwrap();

        assert_eq!(first, json!({ "node": "B" }));
        assert_eq!(second, json!({ "node": "A" }));
        assert_eq!(third, json!({ "node": "B" }));
    }

    #[tokio::test]
    async fn test_round_robin_fairness() {
        let ca = TestCa::new().unwrap();
        let nodes = vec![
            identity_node(&ca, "A").await,
            identity_node(&ca, "B").await,
            identity_node(&ca, "C").await,
        ];

        let client = LedgerClient::new(config(
            &ca,
            nodes.iter().map(|n| n.addr().to_string()).collect(),
            Duration::from_secs(5),
        ))
        .unwrap();

        let mut counts = std::collections::HashMap::new();
        for _ in 0..9 {
            let reply = client.node_info().await.unwrap();
            let name = reply["node"].as_str().unwrap().to_string();
            *counts.entry(name).or_insert(0usize) += 1;
        }

        // 9 calls over 3 healthy endpoints: exactly 3 each.
        for name in ["A", "B", "C"] {
            assert_eq!(counts[name], 3, "endpoint {} under-selected", name);
        }
    }

    #[tokio::test]
    async fn test_timeout_abandonment() {
        let ca = TestCa::new().unwrap();
        let node = MockNode::start(
            &ca,
            Arc::new(SleepHandler {
                delay: Duration::from_secs(2),
                payload: json!({}),
            }),
        )
        .await
        .unwrap();

        let client = LedgerClient::new(config(
            &ca,
            vec![node.addr().to_string()],
            Duration::from_millis(200),
        ))
        .unwrap();

        let start = Instant::now();
        let result = client.node_info().await;
        let elapsed = start.elapsed();

        match result {
            Err(ClientError::RequestTimeout { timeout_ms }) => assert_eq!(timeout_ms, 200),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(elapsed >= Duration::from_millis(150), "returned too early");
        assert!(
            elapsed < Duration::from_secs(1),
            "timeout did not fire near the configured budget: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_close_unblocks_waiter() {
        let ca = TestCa::new().unwrap();
        let node = MockNode::start(
            &ca,
            Arc::new(SleepHandler {
                delay: Duration::from_secs(5),
                payload: json!({}),
            }),
        )
        .await
        .unwrap();

        let client = Arc::new(
            LedgerClient::new(config(
                &ca,
                vec![node.addr().to_string()],
                Duration::from_secs(10),
            ))
            .unwrap(),
        );

        let start = Instant::now();
        let waiter = {
            let client = client.clone();
            tokio::spawn(async move { client.node_info().await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        client.close().await;

        let result = waiter.await.unwrap();
        match result {
            Err(ClientError::ConnectionClosed) => {}
            other => panic!("expected closed, got {:?}", other),
        }
        // Promptly, not after the 10s call budget.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_reconnect_after_invalidation() {
        let ca = TestCa::new().unwrap();
        let node = identity_node(&ca, "A").await;

        let client = LedgerClient::new(config(
            &ca,
            vec![node.addr().to_string()],
            Duration::from_secs(5),
        ))
        .unwrap();

        client.node_info().await.unwrap();
        assert_eq!(node.accepted_connections(), 1);

        node.drop_connections();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The call that observes the broken stream fails and invalidates
        // the connection...
        let err = client.node_info().await.unwrap_err();
        assert!(err.is_connection_fatal(), "unexpected error: {:?}", err);

        // ...so the next call dials afresh and succeeds.
        let reply = client.node_info().await.unwrap();
        assert_eq!(reply, json!({ "node": "A" }));
        assert_eq!(node.accepted_connections(), 2);
    }

    #[tokio::test]
    async fn test_idempotent_close() {
        let ca = TestCa::new().unwrap();
        let node = identity_node(&ca, "A").await;

        let client = LedgerClient::new(config(
            &ca,
            vec![node.addr().to_string()],
            Duration::from_secs(5),
        ))
        .unwrap();

        // Closing an unconnected router is a no-op, twice.
        client.close().await;
        client.close().await;

        client.node_info().await.unwrap();
        client.close().await;
        client.close().await;

        // A closed router is not poisoned; the next call reconnects.
        client.node_info().await.unwrap();
        assert_eq!(node.accepted_connections(), 2);
    }

    #[tokio::test]
    async fn test_remote_error_passthrough() {
        let ca = TestCa::new().unwrap();
        let node = MockNode::start(
            &ca,
            Arc::new(FailingHandler {
                message: "tx rejected".to_string(),
            }),
        )
        .await
        .unwrap();

        let client = LedgerClient::new(config(
            &ca,
            vec![node.addr().to_string()],
            Duration::from_secs(5),
        ))
        .unwrap();

        match client.transaction_status("deadbeef").await {
            Err(ClientError::Remote(message)) => assert_eq!(message, "tx rejected"),
            other => panic!("expected remote error, got {:?}", other),
        }

        // A remote error is not connection-invalidating: the same
        // connection serves the next call.
        match client.transaction_status("deadbeef").await {
            Err(ClientError::Remote(_)) => {}
            other => panic!("expected remote error, got {:?}", other),
        }
        assert_eq!(node.accepted_connections(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let ca = TestCa::new().unwrap();

        // Bind and immediately drop a listener to get a port nothing
        // listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = LedgerClient::new(config(
            &ca,
            vec![format!("127.0.0.1:{}", port)],
            Duration::from_secs(1),
        ))
        .unwrap();

        match client.node_info().await {
            Err(ClientError::ConnectionUnestablished { .. }) => {}
            other => panic!("expected unestablished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_typed_wrapper_marshalling() {
        let ca = TestCa::new().unwrap();
        let node = MockNode::start(&ca, Arc::new(EchoHandler)).await.unwrap();

        let client = LedgerClient::new(config(
            &ca,
            vec![node.addr().to_string()],
            Duration::from_secs(5),
        ))
        .unwrap();

        // The echo node reflects the marshalled argument record, proving
        // the wrapper put the right shape on the wire.
        let reply = client.transaction_status("deadbeef").await.unwrap();
        assert_eq!(reply, json!({ "txId": "deadbeef" }));

        let reply = client.proof("pay-1", "nonce-1").await.unwrap();
        assert_eq!(reply, json!({ "payId": "pay-1", "nonce": "nonce-1" }));

        let reply = client.node_info().await.unwrap();
        assert_eq!(reply, json!({}));
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_connection() {
        let ca = TestCa::new().unwrap();
        let node = MockNode::start(
            &ca,
            Arc::new(SleepHandler {
                delay: Duration::from_millis(100),
                payload: json!({ "ok": true }),
            }),
        )
        .await
        .unwrap();

        let client = Arc::new(
            LedgerClient::new(config(
                &ca,
                vec![node.addr().to_string()],
                Duration::from_secs(5),
            ))
            .unwrap(),
        );

        let start = Instant::now();
        let (a, b) = tokio::join!(
            {
                let client = client.clone();
                async move { client.node_info().await }
            },
            {
                let client = client.clone();
                async move { client.node_info().await }
            }
        );
        a.unwrap();
        b.unwrap();

        // Both calls are in flight at once over the single connection;
        // replies are correlated by id, not by order.
        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(node.accepted_connections(), 1);
    }
}
