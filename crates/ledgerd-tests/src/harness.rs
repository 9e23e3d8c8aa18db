//! In-process mock ledgerd node used by the resilience suites.
//!
//! Each node binds an ephemeral local port, terminates TLS with a
//! certificate minted for `localhost` by a per-test CA, and answers
//! line-delimited JSON-RPC requests through a pluggable handler. The
//! accept loop keeps serving new connections so reconnect scenarios work.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ledgerd_client::jsonrpc::{Request, Response};
use ledgerd_client::tls::{self, TlsAcceptor};
use ledgerd_client::TlsOptions;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::debug;

/// Initializes test logging once; safe to call from every test.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Throwaway certificate authority shared by the mock nodes of one test.
pub struct TestCa {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl TestCa {
    /// Generates a fresh CA key pair.
    pub fn new() -> anyhow::Result<Self> {
        let (cert_pem, key_pem) = tls::generate_self_signed_ca()?;
        Ok(Self { cert_pem, key_pem })
    }

    /// PEM of the CA certificate.
    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    /// Client TLS options trusting this CA, with verification on.
    pub fn client_tls(&self) -> TlsOptions {
        TlsOptions {
            ca_cert_pem: self.cert_pem.clone(),
            danger_accept_invalid_certs: false,
        }
    }
}

/// Per-node request handler.
pub trait NodeHandler: Send + Sync + 'static {
    /// Handles one decoded request, returning the result payload or the
    /// error string to send back.
    fn handle(
        &self,
        method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + '_>>;
}

/// Answers every method with a fixed payload.
pub struct IdentityHandler {
    /// Payload identifying this node.
    pub payload: Value,
}

impl NodeHandler for IdentityHandler {
    fn handle(
        &self,
        _method: &str,
        _params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + '_>> {
        let payload = self.payload.clone();
        Box::pin(async move { Ok(payload) })
    }
}

/// Delays every reply by a fixed duration, then answers with a payload.
pub struct SleepHandler {
    /// Reply delay.
    pub delay: Duration,
    /// Payload returned after the delay.
    pub payload: Value,
}

impl NodeHandler for SleepHandler {
    fn handle(
        &self,
        _method: &str,
        _params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + '_>> {
        let delay = self.delay;
        let payload = self.payload.clone();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(payload)
        })
    }
}

/// Fails every request with a fixed error string.
pub struct FailingHandler {
    /// Error message sent back.
    pub message: String,
}

impl NodeHandler for FailingHandler {
    fn handle(
        &self,
        _method: &str,
        _params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + '_>> {
        let message = self.message.clone();
        Box::pin(async move { Err(message) })
    }
}

/// Echoes the request params back as the result.
pub struct EchoHandler;

impl NodeHandler for EchoHandler {
    fn handle(
        &self,
        _method: &str,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send + '_>> {
        Box::pin(async move { Ok(params) })
    }
}

/// A mock ledgerd node on an ephemeral local port.
pub struct MockNode {
    addr: String,
    accepted: Arc<AtomicUsize>,
    conn_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept_task: JoinHandle<()>,
}

impl MockNode {
    /// Starts a node whose certificate chains to `ca`.
    pub async fn start(ca: &TestCa, handler: Arc<dyn NodeHandler>) -> anyhow::Result<Self> {
        let (cert_pem, key_pem) =
            tls::generate_server_cert(&ca.cert_pem, &ca.key_pem, "localhost")?;
        let acceptor = Arc::new(TlsAcceptor::from_pem(&cert_pem, &key_pem)?);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        // The certificate names "localhost", so clients must dial the
        // hostname rather than the raw IP.
        let addr = format!("localhost:{}", port);

        let accepted = Arc::new(AtomicUsize::new(0));
        let conn_tasks: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));

        let accept_task = {
            let accepted = accepted.clone();
            let conn_tasks = conn_tasks.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let acceptor = acceptor.clone();
                    let handler = handler.clone();
                    let task = tokio::spawn(async move {
                        match acceptor.accept(stream).await {
                            Ok(stream) => serve_connection(stream, handler).await,
                            Err(e) => debug!(error = %e, "mock node handshake failed"),
                        }
                    });
                    conn_tasks.lock().unwrap().push(task);
                }
            })
        };

        Ok(Self {
            addr,
            accepted,
            conn_tasks,
            accept_task,
        })
    }

    /// Address clients should dial.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Number of TCP connections accepted so far.
    pub fn accepted_connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Drops every live connection. The listener keeps accepting, so
    /// clients can reconnect afterwards.
    pub fn drop_connections(&self) {
        let mut tasks = self.conn_tasks.lock().unwrap();
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.drop_connections();
    }
}

async fn serve_connection(
    stream: tokio_rustls::server::TlsStream<TcpStream>,
    handler: Arc<dyn NodeHandler>,
) {
    let (read, write) = tokio::io::split(stream);
    let write = Arc::new(tokio::sync::Mutex::new(write));
    let mut lines = BufReader::new(read).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "mock node dropping undecodable request");
                break;
            }
        };

        // Requests are answered out of band so a slow handler does not
        // block the next request on the same connection.
        let handler = handler.clone();
        let write = write.clone();
        tokio::spawn(async move {
            let [params] = request.params;
            let response = match handler.handle(&request.method, params).await {
                Ok(result) => Response::success(request.id, result),
                Err(message) => Response::failure(request.id, &message),
            };
            let mut line = match serde_json::to_vec(&response) {
                Ok(line) => line,
                Err(_) => return,
            };
            line.push(b'\n');
            let mut write = write.lock().await;
            let _ = write.write_all(&line).await;
            let _ = write.flush().await;
        });
    }
}
