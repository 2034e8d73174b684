//! Transport streams for connecting to remote servers.
//!
//! Transports are responsible for establishing a connection to a remote
//! server and producing a byte stream. A transport is any
//! [`tower::Service`] from a [`Target`] to an async stream; the connection
//! client drives exactly one such stream per request, and never reuses it.
//!
//! - [`tcp::TcpTransport`] opens a TCP socket.
//! - [`tls::TlsTransport`] wraps another transport and negotiates TLS.
//! - [`duplex::DuplexTransport`] connects in memory, for tests.

use std::future::Future;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::request::Target;
use crate::BoxError;

pub mod duplex;
pub mod tcp;
pub mod tls;

/// A service which connects to a [`Target`], returning a byte stream.
///
/// This trait is implemented for every suitable [`tower::Service`], and
/// exists to name the bounds in one place.
pub trait Transport: Clone + Send + Sync + 'static {
    /// The stream produced by a successful connection.
    type IO: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// The error produced when the connection fails.
    type Error: Into<BoxError>;

    /// The future returned by [`Transport::connect`].
    type Future: Future<Output = Result<Self::IO, <Self as Transport>::Error>> + Send + 'static;

    /// Connect to the given target.
    fn connect(&mut self, target: Target) -> <Self as Transport>::Future;

    /// Check that the transport is ready to connect.
    fn poll_ready(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), <Self as Transport>::Error>>;
}

impl<T, IO> Transport for T
where
    T: tower::Service<Target, Response = IO> + Clone + Send + Sync + 'static,
    <T as tower::Service<Target>>::Error: Into<BoxError>,
    <T as tower::Service<Target>>::Future: Send + 'static,
    IO: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type IO = IO;
    type Error = <T as tower::Service<Target>>::Error;
    type Future = <T as tower::Service<Target>>::Future;

    fn connect(&mut self, target: Target) -> <Self as tower::Service<Target>>::Future {
        tower::Service::call(self, target)
    }

    fn poll_ready(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), <Self as tower::Service<Target>>::Error>> {
        tower::Service::poll_ready(self, cx)
    }
}
