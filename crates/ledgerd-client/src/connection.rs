//! A single live connection to one ledgerd node.
//!
//! Owns the TLS stream end to end: dials with a bounded connect, splits the
//! stream, and runs a background reader task that correlates response ids to
//! pending oneshot channels. When the reader stops (peer reset, EOF, or an
//! undecodable line) every in-flight call is failed so its waiter wakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::config::TcpConfig;
use crate::error::{ClientError, Result};
use crate::jsonrpc::{Request, Response};
use crate::tls::{TlsClient, TlsOptions};

type ClientStream = tokio_rustls::client::TlsStream<TcpStream>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// One encrypted stream plus the reader task multiplexing replies on it.
pub(crate) struct Connection {
    write: Mutex<WriteHalf<ClientStream>>,
    pending: Pending,
    next_id: AtomicU64,
    failed: Arc<AtomicBool>,
    reader: tokio::task::JoinHandle<()>,
    peer_addr: String,
}

impl Connection {
    /// Dials `addr`, performs the TLS handshake, and starts the reader task.
    pub(crate) async fn dial(addr: &str, tcp: &TcpConfig, tls: &TlsOptions) -> Result<Self> {
        let stream = tokio::time::timeout(tcp.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectionTimeout {
                addr: addr.to_string(),
                timeout_ms: tcp.connect_timeout.as_millis() as u64,
            })?
            .map_err(ClientError::Io)?;

        if tcp.nodelay {
            stream.set_nodelay(true).map_err(ClientError::Io)?;
        }

        let connector = TlsClient::new(tls)?;
        let host = addr.rsplit_once(':').map(|(h, _)| h).unwrap_or(addr);
        let tls_stream = connector.connect(host, stream).await?;

        debug!(addr = addr, "connected");

        let (read, write) = tokio::io::split(tls_stream);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let failed = Arc::new(AtomicBool::new(false));
        let reader = spawn_reader(read, pending.clone(), failed.clone(), addr.to_string());

        Ok(Self {
            write: Mutex::new(write),
            pending,
            next_id: AtomicU64::new(1),
            failed,
            reader,
            peer_addr: addr.to_string(),
        })
    }

    /// Registers a pending call and writes the request line.
    ///
    /// Returns the request id together with the receiver the reader task
    /// will complete; the caller races that receiver against its timeout
    /// and closed signal.
    pub(crate) async fn start_call(
        &self,
        method: &str,
        params: Value,
    ) -> Result<(u64, oneshot::Receiver<Response>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(method, params, id);
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // The reader may have stopped between our registration and its
        // drain of the pending map; re-checking after the insert closes
        // that window.
        if self.failed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(ClientError::ConnectionReset);
        }

        let send = async {
            let mut write = self.write.lock().await;
            write.write_all(&line).await?;
            write.flush().await
        };
        if let Err(e) = send.await {
            self.pending.lock().await.remove(&id);
            return Err(ClientError::Io(e));
        }

        Ok((id, rx))
    }

    /// Drops the pending entry for an abandoned call.
    pub(crate) async fn forget(&self, id: u64) {
        self.pending.lock().await.remove(&id);
    }

    /// Remote address this connection was dialed to.
    pub(crate) fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn spawn_reader(
    read: ReadHalf<ClientStream>,
    pending: Pending,
    failed: Arc<AtomicBool>,
    addr: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(read).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Response>(line) {
                        Ok(response) => {
                            let mut map = pending.lock().await;
                            // A missing entry means the call was abandoned
                            // (timeout or close); the late reply is dropped.
                            if let Some(tx) = map.remove(&response.id) {
                                let _ = tx.send(response);
                            }
                        }
                        Err(e) => {
                            // The stream is no longer in a known state.
                            warn!(addr = %addr, error = %e, "undecodable response line, dropping connection");
                            break;
                        }
                    }
                }
                Ok(None) => {
                    debug!(addr = %addr, "server closed the stream");
                    break;
                }
                Err(e) => {
                    warn!(addr = %addr, error = %e, "read error, stopping reader");
                    break;
                }
            }
        }

        // Mark failed before draining so start_call cannot register a
        // waiter nobody will ever answer.
        failed.store(true, Ordering::SeqCst);
        pending.lock().await.clear();
    })
}
