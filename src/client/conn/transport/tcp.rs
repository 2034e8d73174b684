//! TCP transport implementation for client connections.
//!
//! This module contains the [`TcpTransport`] type, which is a [`tower::Service`] that connects to
//! remote targets using TCP, and the [`TcpTransportConfig`] type, which is used to
//! configure TCP connections.
//!
//! Normally, you will not need to use this module directly. [`Client::builder`][crate::Client::builder]
//! uses a [`TcpTransport`] wrapped in TLS by default.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{trace, warn, Instrument};

use crate::request::Target;

/// A TCP connector for client connections.
///
/// Host names are resolved with the system resolver, and each resolved
/// address is tried in turn until one accepts the connection.
///
/// # Example
/// ```no_run
/// # use gemdrive::client::conn::transport::tcp::TcpTransport;
/// # use gemdrive::request::Target;
/// # use tower::ServiceExt as _;
///
/// # async fn run() {
/// let transport = TcpTransport::default();
///
/// let stream = transport.oneshot(Target::new("example.com", 1965)).await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: Arc<TcpTransportConfig>,
}

impl TcpTransport {
    /// Create a new TCP transport with the given configuration.
    pub fn new(config: TcpTransportConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Get the configuration for the TCP connector.
    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }
}

type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

impl tower::Service<Target> for TcpTransport {
    type Response = TcpStream;
    type Error = TcpConnectionError;
    type Future = BoxFuture<'static, Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, target: Target) -> Self::Future {
        let config = self.config.clone();
        let span = tracing::trace_span!("tcp", host = %target.host(), port = %target.port());

        Box::pin(
            async move {
                let stream = connect(&target, &config).await?;

                if let Ok(peer_addr) = stream.peer_addr() {
                    trace!(peer.addr = %peer_addr, "tcp connected");
                } else {
                    trace!("tcp connected");
                }

                Ok(stream)
            }
            .instrument(span),
        )
    }
}

async fn connect(
    target: &Target,
    config: &TcpTransportConfig,
) -> Result<TcpStream, TcpConnectionError> {
    let connect = TcpStream::connect((target.host(), target.port()));
    let stream = match config.connect_timeout {
        Some(dur) => match tokio::time::timeout(dur, connect).await {
            Ok(result) => result,
            Err(_) => {
                trace!(timeout=?dur, "connection timed out");
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connection timed out after {}ms", dur.as_millis()),
                ))
            }
        },
        None => connect.await,
    }
    .map_err(TcpConnectionError::msg("tcp connect error"))?;

    let _guard = tracing::trace_span!("socket_options").entered();

    if config.nodelay {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("tcp set_nodelay error: {}", e);
        }
    }

    if let Some(dur) = config.keep_alive_timeout {
        let keepalive = socket2::TcpKeepalive::new().with_time(dur);
        if let Err(e) = socket2::SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
            warn!("tcp set_keepalive error: {}", e);
        }
    }

    Ok(stream)
}

/// Error type for TCP connections.
#[derive(Debug, Error)]
pub struct TcpConnectionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TcpConnectionError {
    pub(super) fn msg<S, E>(message: S) -> impl FnOnce(E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        move |error| Self {
            message: message.into(),
            source: Some(error.into()),
        }
    }
}

impl fmt::Display for TcpConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref source) = self.source {
            write!(f, "{}: {}", self.message, source)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Configuration for TCP connections.
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    /// The timeout for connecting to a remote address.
    pub connect_timeout: Option<Duration>,

    /// The idle time before TCP keep-alive probes are sent.
    pub keep_alive_timeout: Option<Duration>,

    /// Whether to disable Nagle's algorithm.
    pub nodelay: bool,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            keep_alive_timeout: Some(Duration::from_secs(90)),
            nodelay: true,
        }
    }
}
