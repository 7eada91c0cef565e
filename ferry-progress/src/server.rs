//! WebSocket server delivering progress to subscribers.
//!
//! Clients connect to `GET <path>/<upload-id>`; any other path is refused
//! with 404 during the handshake.

use crate::error::PushResult;
use crate::message::PushMessage;
use crate::service::ProgressService;
use crate::subscriber::{Subscriber, SubscriberState, SubscriberWriter};
use futures_util::StreamExt;
use http::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_util::sync::CancellationToken;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Default route prefix for progress subscriptions.
pub const DEFAULT_PROGRESS_PATH: &str = "/api/ws/progress";

/// Progress server configuration.
#[derive(Debug, Clone)]
pub struct ProgressServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Route prefix; the upload-id is the final path segment
    pub path: String,
}

impl Default for ProgressServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5051)),
            path: DEFAULT_PROGRESS_PATH.to_string(),
        }
    }
}

impl ProgressServerConfig {
    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the route prefix.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// WebSocket server feeding a [`ProgressService`]'s hub.
#[derive(Debug, Clone)]
pub struct ProgressServer {
    config: ProgressServerConfig,
    service: Arc<ProgressService>,
}

impl ProgressServer {
    /// Create a server for `service`.
    pub fn new(config: ProgressServerConfig, service: Arc<ProgressService>) -> Self {
        Self { config, service }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ProgressServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> PushResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> PushResult<()> {
        tracing::info!(
            addr = %listener.local_addr()?,
            path = %self.config.path,
            "Progress server listening"
        );

        let path: Arc<str> = Arc::from(self.config.path.trim_end_matches('/'));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let service = Arc::clone(&self.service);
                        let path = Arc::clone(&path);
                        let shutdown = shutdown.child_token();

                        tokio::spawn(async move {
                            if let Err(e) =
                                Self::handle_connection(stream, addr, service, path, shutdown).await
                            {
                                tracing::debug!(addr = %addr, error = %e, "Progress connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                }
            }
        }

        tracing::info!("Progress server stopped");
        Ok(())
    }

    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        service: Arc<ProgressService>,
        path: Arc<str>,
        shutdown: CancellationToken,
    ) -> PushResult<()> {
        let mut requested = None;
        let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
            match upload_id_from_path(&path, request.uri().path()) {
                Some(upload_id) => {
                    requested = Some(upload_id.to_string());
                    Ok(response)
                }
                None => {
                    let mut refusal = ErrorResponse::new(Some("Not Found".to_string()));
                    *refusal.status_mut() = StatusCode::NOT_FOUND;
                    Err(refusal)
                }
            }
        })
        .await?;
        let Some(upload_id) = requested else {
            return Ok(());
        };

        let (write, mut read) = ws_stream.split();
        let (subscriber, rx) = Subscriber::channel(upload_id.clone(), Some(addr));
        let connection_id = subscriber.connection_id.clone();
        service.subscribe(subscriber.clone());

        tracing::debug!(upload_id = %upload_id, connection_id = %connection_id, addr = %addr, "Progress subscriber connected");

        let writer = SubscriberWriter::new(write, rx);
        let writer_handle = tokio::spawn(writer.run());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                next = read.next() => match next {
                    Some(Ok(tungstenite::Message::Ping(data))) => {
                        let _ = subscriber.send(PushMessage::Pong(data));
                    }
                    Some(Ok(tungstenite::Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(upload_id = %upload_id, error = %e, "Progress socket read failed");
                        break;
                    }
                }
            }
        }

        subscriber.close();
        let _ = writer_handle.await;
        subscriber.set_state(SubscriberState::Closed);

        service.unsubscribe_connection(&upload_id, &connection_id);

        tracing::debug!(upload_id = %upload_id, connection_id = %connection_id, "Progress subscriber disconnected");

        Ok(())
    }
}

/// Extract the upload-id from `<base>/<upload-id>`.
pub(crate) fn upload_id_from_path<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(base)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}
