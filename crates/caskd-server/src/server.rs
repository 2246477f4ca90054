//! The HTTP serving loop.
//!
//! One hyper connection task per client; each request's body is collected
//! to bytes, the path is resolved against the handler registry, and the
//! matched handler produces the response. Requests to unmounted paths get
//! a plain 404.
//!
//! # Example
//!
//! ```rust,ignore
//! use caskd_server::{HandlerRegistry, Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), caskd_server::ServerError> {
//!     let registry = build_registry()?; // mount the web handler etc.
//!     let server = Server::new(ServerConfig::default(), Arc::new(registry));
//!     server.run().await
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;

use caskd_core::HttpResponse;

use crate::config::ServerConfig;
use crate::registry::HandlerRegistry;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Errors that prevent the server from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be bound.
    #[error("bind error: {0}")]
    Bind(String),
}

/// The caskd HTTP server.
pub struct Server {
    config: ServerConfig,
    registry: Arc<HandlerRegistry>,
}

impl Server {
    /// Creates a server over a fully built registry.
    #[must_use]
    pub fn new(config: ServerConfig, registry: Arc<HandlerRegistry>) -> Self {
        Self { config, registry }
    }

    /// Runs until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until `shutdown` triggers; useful for tests and embedding.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::Bind(format!("invalid address {:?}: {e}", self.config.http_addr())))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let guard = tracker.acquire();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req: Request<Incoming>| {
                                    let server = Arc::clone(&server);
                                    async move { server.handle_request(req).await }
                                });
                                let conn = http1::Builder::new().serve_connection(io, service);
                                tokio::select! {
                                    result = conn => {
                                        if let Err(err) = result {
                                            tracing::debug!(%remote_addr, error = %err, "connection error");
                                        }
                                    }
                                    _ = shutdown.recv() => {}
                                }
                                drop(guard);
                            });
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        let timeout = server.config.shutdown_timeout();
        tracing::info!(
            connections = tracker.active_connections(),
            ?timeout,
            "waiting for in-flight connections"
        );
        tokio::select! {
            _ = tracker.wait_idle() => {
                tracing::info!("all connections closed");
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "shutdown timeout reached"
                );
            }
        }
        Ok(())
    }

    async fn handle_request(
        self: &Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<HttpResponse, Infallible> {
        let (parts, body) = req.into_parts();
        tracing::debug!(method = %parts.method, path = parts.uri.path(), "request");

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read request body");
                return Ok(plain(StatusCode::BAD_REQUEST, "Failed to read request body\n"));
            }
        };

        let Some(mount) = self.registry.resolve(parts.uri.path()) else {
            return Ok(plain(StatusCode::NOT_FOUND, "404 page not found\n"));
        };
        Ok(mount.handler().serve(&parts, body).await)
    }
}

fn plain(status: StatusCode, body: &str) -> HttpResponse {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
}
