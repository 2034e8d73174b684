//! The connection client: one request over one stream.
//!
//! [`Connector::fetch`] connects with its [`Transport`], writes the request
//! line once, then reads until the server closes the stream. The collected
//! bytes are handed to the [response parser][crate::response::parse].
//!
//! A fetch moves through these states:
//!
//! ```text
//! Connecting -> Ready -> Receiving -> Closed
//!      |          |          |
//!      +----------+----------+------> Failed | Cancelled
//! ```
//!
//! Cancellation comes from a [`CancellationToken`] owned by the caller. Each
//! suspension point races the token, so a cancelled fetch stops at the next
//! await and drops its stream, closing the socket, without reading or
//! writing anything further. A server closing the stream and a caller
//! cancelling can happen together; if the token is set by the time the
//! stream ends, the result is [`Error::Cancelled`], never a late response.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, Instrument as _};

use crate::client::Error;
use crate::request::{Request, Target};
use crate::response::{self, Response};

pub mod transport;

pub use self::transport::duplex::DuplexTransport;
pub use self::transport::tcp::{TcpTransport, TcpTransportConfig};
pub use self::transport::tls::{TlsConnectionError, TlsPolicy, TlsTransport};
pub use self::transport::Transport;

const READ_CHUNK: usize = 8 * 1024;

/// The lifecycle of a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Opening the stream and negotiating TLS.
    Connecting,

    /// The stream is open and the request has not been written yet.
    Ready,

    /// The request was written, and the response is being collected.
    Receiving,

    /// The server closed the stream.
    Closed,

    /// The transport failed.
    Failed,

    /// The caller cancelled the fetch.
    Cancelled,
}

impl State {
    /// Returns true once the fetch has produced its result.
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, State::Closed | State::Failed | State::Cancelled)
    }
}

/// How the receiving phase of a fetch ended.
#[derive(Debug)]
enum Outcome {
    PeerClosed,
    Failed(Error),
    Cancelled,
}

/// Per-fetch state. Never shared between fetches.
#[derive(Debug)]
struct Session {
    state: State,
    buffer: BytesMut,
    max_size: Option<usize>,
    cancel: CancellationToken,
}

impl Session {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            state: State::Connecting,
            buffer: BytesMut::new(),
            max_size: None,
            cancel,
        }
    }

    fn with_max_size(mut self, max_size: Option<usize>) -> Self {
        self.max_size = max_size;
        self
    }

    fn transition(&mut self, next: State) {
        debug_assert!(
            !self.state.is_terminal(),
            "fetch already resolved as {:?}",
            self.state
        );
        trace!(from = ?self.state, to = ?next, "fetch state");
        self.state = next;
    }

    /// Produce the result of the fetch. Consumes the session, so this can
    /// only happen once.
    fn resolve(mut self, outcome: Outcome) -> Result<Response, Error> {
        match outcome {
            Outcome::Cancelled => {
                self.transition(State::Cancelled);
                debug!("fetch cancelled");
                Err(Error::Cancelled)
            }
            Outcome::Failed(error) => {
                self.transition(State::Failed);
                debug!(%error, "fetch failed");
                Err(error)
            }
            Outcome::PeerClosed if self.cancel.is_cancelled() => {
                self.transition(State::Cancelled);
                debug!(received = self.buffer.len(), "fetch cancelled as stream closed");
                Err(Error::Cancelled)
            }
            Outcome::PeerClosed => {
                self.transition(State::Closed);
                let response = response::parse(self.buffer.freeze())?;
                debug!(status = %response.status(), meta = %response.meta(), "response");
                Ok(response)
            }
        }
    }

    async fn run<T>(
        mut self,
        mut transport: T,
        request: &Request,
        read_timeout: Option<Duration>,
    ) -> Result<Response, Error>
    where
        T: Transport,
    {
        let cancel = self.cancel.clone();

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.resolve(Outcome::Cancelled),
            connected = connect(&mut transport, request.target().clone()) => connected,
        };

        let mut stream = match connected {
            Ok(stream) => stream,
            Err(error) => return self.resolve(Outcome::Failed(error)),
        };

        self.transition(State::Ready);
        if cancel.is_cancelled() {
            drop(stream);
            return self.resolve(Outcome::Cancelled);
        }

        let line = request.line();
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.resolve(Outcome::Cancelled),
            written = send(&mut stream, &line) => written,
        };

        if let Err(error) = written {
            return self.resolve(Outcome::Failed(Error::transport(error)));
        }

        self.transition(State::Receiving);
        let outcome = self.receive(&mut stream, read_timeout).await;
        drop(stream);

        self.resolve(outcome)
    }

    async fn receive<IO>(&mut self, stream: &mut IO, read_timeout: Option<Duration>) -> Outcome
    where
        IO: AsyncRead + Unpin,
    {
        let cancel = self.cancel.clone();
        loop {
            self.buffer.reserve(READ_CHUNK);

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                read = read_some(stream, &mut self.buffer, read_timeout) => read,
            };

            match read {
                Ok(0) => return Outcome::PeerClosed,
                Ok(n) => {
                    trace!(n, total = self.buffer.len(), "read");
                    if let Some(max) = self.max_size.filter(|max| self.buffer.len() > *max) {
                        return Outcome::Failed(Error::transport(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("response exceeds {max} bytes"),
                        )));
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("stream closed without close_notify");
                    return Outcome::PeerClosed;
                }
                Err(error) => return Outcome::Failed(Error::transport(error)),
            }
        }
    }
}

async fn connect<T>(transport: &mut T, target: Target) -> Result<T::IO, Error>
where
    T: Transport,
{
    futures_util::future::poll_fn(|cx| transport.poll_ready(cx))
        .await
        .map_err(Error::transport)?;
    transport.connect(target).await.map_err(Error::transport)
}

async fn send<IO>(stream: &mut IO, line: &[u8]) -> io::Result<()>
where
    IO: AsyncWrite + Unpin,
{
    stream.write_all(line).await?;
    stream.flush().await
}

async fn read_some<IO>(
    stream: &mut IO,
    buffer: &mut BytesMut,
    timeout: Option<Duration>,
) -> io::Result<usize>
where
    IO: AsyncRead + Unpin,
{
    match timeout {
        Some(dur) => match tokio::time::timeout(dur, stream.read_buf(buffer)).await {
            Ok(read) => read,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no data received for {}ms", dur.as_millis()),
            )),
        },
        None => stream.read_buf(buffer).await,
    }
}

/// Performs single requests over a [`Transport`].
///
/// Every call to [`fetch`][Connector::fetch] opens its own stream and
/// closes it before returning. Streams are never pooled or reused.
#[derive(Debug, Clone)]
pub struct Connector<T> {
    transport: T,
    read_timeout: Option<Duration>,
    max_response_size: Option<usize>,
}

impl<T> Connector<T> {
    /// Create a connector using the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            read_timeout: None,
            max_response_size: None,
        }
    }

    /// Fail a fetch if no data arrives for this long.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Fail a fetch once the response grows past this many bytes.
    pub fn with_max_response_size(mut self, max_response_size: Option<usize>) -> Self {
        self.max_response_size = max_response_size;
        self
    }

    /// The transport used to open streams.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T> Connector<T>
where
    T: Transport,
{
    /// Send one request and collect the response.
    ///
    /// Resolves with exactly one of: the parsed response,
    /// [`Error::Transport`], [`Error::MalformedResponse`] or
    /// [`Error::Cancelled`].
    pub async fn fetch(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response, Error> {
        let span = tracing::debug_span!("fetch", host = %request.host(), port = request.port());
        let session = Session::new(cancel.clone()).with_max_size(self.max_response_size);
        session
            .run(self.transport.clone(), request, self.read_timeout)
            .instrument(span)
            .await
    }
}
