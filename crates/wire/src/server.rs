//! Protocol server
//!
//! `ProtocolServer::start` binds the listener, spawns the accept loop and
//! returns only after the loop has acknowledged that it is accepting
//! connections. Each connection is served by its own task, one request at a
//! time, until the peer disconnects or the server shuts down.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docparity_engine::Store;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{read_frame, write_frame};
use crate::commands::dispatch;
use crate::envelope::{decode_request, encode_response, ApiError, Response, BAD_VALUE};
use crate::error::{Result, WireError};

/// Default bound on waiting for the accept loop to come up
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:27018` (port 0 picks a free port)
    pub listen: String,
    /// How long `start` waits for the readiness acknowledgment
    pub ready_timeout: Duration,
}

impl ServerConfig {
    pub fn new(listen: impl Into<String>) -> Self {
        ServerConfig {
            listen: listen.into(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Handle to a running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close open connections and wait for the accept loop.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            join.await.map_err(|e| WireError::Io {
                context: "server shutdown".to_string(),
                reason: e.to_string(),
            })?;
            info!(target: "docparity::wire", addr = %self.local_addr, "Protocol server stopped");
        }
        Ok(())
    }

    /// True until `shutdown` has completed
    pub fn is_running(&self) -> bool {
        self.join.is_some()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// The protocol server
pub struct ProtocolServer;

impl ProtocolServer {
    /// Bind and start serving `store`.
    ///
    /// Returns once the accept loop is running, or fails if the listener
    /// cannot be bound or readiness is not acknowledged within
    /// `config.ready_timeout`.
    pub async fn start(config: &ServerConfig, store: Arc<dyn Store>) -> Result<ServerHandle> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .map_err(|e| WireError::Bind {
                addr: config.listen.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| WireError::Bind {
            addr: config.listen.clone(),
            reason: e.to_string(),
        })?;

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(accept_loop(listener, store, ready_tx, shutdown_rx));

        match tokio::time::timeout(config.ready_timeout, ready_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                join.abort();
                return Err(WireError::NotReady {
                    reason: "accept loop exited before signalling readiness".to_string(),
                });
            }
            Err(_) => {
                join.abort();
                return Err(WireError::NotReady {
                    reason: format!("no readiness signal within {}ms", config.ready_timeout.as_millis()),
                });
            }
        }

        info!(target: "docparity::wire", addr = %local_addr, "Protocol server listening");
        Ok(ServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        })
    }
}

async fn accept_loop(
    listener: TcpListener,
    store: Arc<dyn Store>,
    ready_tx: oneshot::Sender<()>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let (stop_notify, stop_recv) = watch::channel(false);
    let _ = ready_tx.send(());
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                let _ = stop_notify.send(true);
                break;
            }
            accept = listener.accept() => {
                match accept {
                    Ok((stream, peer)) => {
                        debug!(target: "docparity::wire", %peer, "Accepted connection");
                        let store = Arc::clone(&store);
                        let stop = stop_recv.clone();
                        tokio::spawn(async move {
                            if let Err(err) = serve_connection(stream, store, stop).await {
                                warn!(target: "docparity::wire", %peer, error = %err, "Connection error");
                            }
                        });
                    }
                    Err(err) => {
                        warn!(target: "docparity::wire", error = %err, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        }
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    store: Arc<dyn Store>,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *stop.borrow() {
            return Ok(());
        }
        let frame = tokio::select! {
            _ = stop.changed() => return Ok(()),
            frame = read_frame(&mut stream) => frame?,
        };
        let Some(bytes) = frame else {
            return Ok(());
        };
        let response = match decode_request(&bytes) {
            Ok(request) => dispatch(store.as_ref(), &request),
            Err(e) => Response::error("", ApiError::new(BAD_VALUE, e.to_string())),
        };
        write_frame(&mut stream, &encode_response(&response)?).await?;
    }
}
