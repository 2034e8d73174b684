//! Duplex transport, connecting to an in-memory server.

use std::io;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;

use crate::request::Target;
use crate::stream::duplex::{DuplexClient, DuplexStream};

/// Transport via duplex stream.
///
/// The target is ignored: every connection goes to the
/// [`DuplexIncoming`][crate::stream::duplex::DuplexIncoming] paired with the client.
#[derive(Debug, Clone)]
pub struct DuplexTransport {
    max_buf_size: usize,
    client: DuplexClient,
}

impl DuplexTransport {
    /// Create a new `DuplexTransport`
    pub fn new(max_buf_size: usize, client: DuplexClient) -> Self {
        Self {
            max_buf_size,
            client,
        }
    }
}

impl tower::Service<Target> for DuplexTransport {
    type Response = DuplexStream;

    type Error = io::Error;

    type Future = BoxFuture<'static, Result<DuplexStream, io::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, target: Target) -> Self::Future {
        let client = self.client.clone();
        let max_buf_size = self.max_buf_size;
        let fut = async move {
            tracing::trace!(%target, "duplex connect");
            client.connect(max_buf_size).await
        };

        Box::pin(fut)
    }
}
