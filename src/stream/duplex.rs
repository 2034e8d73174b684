//! In-memory client/server stream pairs.
//!
//! A [`DuplexClient`] and [`DuplexIncoming`] are created together by [`pair`].
//! Every [`DuplexClient::connect`] produces a fresh [`DuplexStream`], and the
//! other half is delivered to the incoming side. Nothing is shared between
//! connections, so each connect behaves like a new socket.
//!
//! The incoming side must be polled for a connect to complete:
//! ```
//! # use gemdrive::stream::duplex;
//! use futures_util::TryStreamExt;
//! # async fn demo_duplex() {
//! let (client, mut incoming) = duplex::pair();
//!
//! let (client_conn, server_conn) = tokio::try_join!(client.connect(1024), incoming.try_next()).unwrap();
//! assert!(server_conn.is_some());
//! # }
//! ```

use std::{
    io,
    pin::Pin,
    task::{ready, Context, Poll},
};

use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncWrite};

/// One half of an in-memory connection.
///
/// Dropping either half closes the connection: the peer reads the remaining
/// buffered bytes and then end-of-stream.
#[derive(Debug)]
#[pin_project]
pub struct DuplexStream {
    #[pin]
    inner: tokio::io::DuplexStream,
}

impl DuplexStream {
    /// Create a connected pair with the given buffer size.
    pub fn new(max_buf_size: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(max_buf_size);
        (DuplexStream { inner: a }, DuplexStream { inner: b })
    }
}

impl AsyncRead for DuplexStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().inner.poll_read(cx, buf)
    }
}

impl AsyncWrite for DuplexStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        self.project().inner.poll_shutdown(cx)
    }
}

/// Client for connecting to a duplex server.
///
/// Cheap to clone; all clones connect to the same [`DuplexIncoming`].
#[derive(Debug, Clone)]
pub struct DuplexClient {
    sender: tokio::sync::mpsc::Sender<DuplexConnectionRequest>,
}

impl DuplexClient {
    /// Connect to the other half of this duplex setup.
    ///
    /// The `max_buf_size` is the maximum size of the buffer used for the stream.
    pub async fn connect(&self, max_buf_size: usize) -> Result<DuplexStream, io::Error> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let request = DuplexConnectionRequest::new(tx, max_buf_size);
        self.sender
            .send(request)
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::ConnectionRefused))?;
        rx.await
            .map_err(|_| io::Error::from(io::ErrorKind::ConnectionReset))
    }
}

/// Gets sent to the incoming side to create a connection.
struct DuplexConnectionRequest {
    ack: tokio::sync::oneshot::Sender<DuplexStream>,
    max_buf_size: usize,
}

impl DuplexConnectionRequest {
    fn new(ack: tokio::sync::oneshot::Sender<DuplexStream>, max_buf_size: usize) -> Self {
        Self { ack, max_buf_size }
    }

    /// Tell the waiting client that the connection has been established.
    fn ack(self) -> Result<DuplexStream, io::Error> {
        let (tx, rx) = DuplexStream::new(self.max_buf_size);
        self.ack
            .send(tx)
            .map_err(|_| io::Error::from(io::ErrorKind::ConnectionReset))?;
        Ok(rx)
    }
}

/// Stream of incoming connections.
#[derive(Debug)]
pub struct DuplexIncoming {
    receiver: tokio::sync::mpsc::Receiver<DuplexConnectionRequest>,
}

impl DuplexIncoming {
    /// Wait for the next connection. Returns `None` once every client is gone.
    pub async fn accept(&mut self) -> Option<io::Result<DuplexStream>> {
        let request = self.receiver.recv().await?;
        Some(request.ack())
    }
}

impl futures_core::Stream for DuplexIncoming {
    type Item = Result<DuplexStream, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match ready!(self.receiver.poll_recv(cx)) {
            Some(request) => Poll::Ready(Some(request.ack())),
            None => Poll::Ready(None),
        }
    }
}

impl std::fmt::Debug for DuplexConnectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexConnectionRequest")
            .field("max_buf_size", &self.max_buf_size)
            .finish()
    }
}

/// Create a new duplex client and incoming pair.
///
/// The client can be cloned and re-used cheaply, and the incoming provides
/// a stream of incoming duplex connections.
pub fn pair() -> (DuplexClient, DuplexIncoming) {
    let (sender, receiver) = tokio::sync::mpsc::channel(32);
    (DuplexClient { sender }, DuplexIncoming { receiver })
}
