//! Gemini client.
//!
//! There are two levels of available APIs in this library:
//!
//! 1. The high-level [`Client`] API, which follows redirects, applies a
//!    deadline to the whole request, and answers input prompts.
//! 2. The [connection][self::conn] API, which performs exactly one request
//!    over one stream. This is useful for implementing custom transports,
//!    or for callers who want to handle redirects themselves.
//!
//! Every request is cancellable through a [`CancellationToken`] supplied by
//! the caller. For a single "current page" that is replaced whenever the
//! user navigates elsewhere, see [`Navigator`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument as _};

use self::conn::{Connector, TcpTransport, TlsTransport, Transport};
use crate::request::Request;
use crate::response::Response;

mod builder;
pub mod conn;
mod error;
mod navigator;
mod redirect;

pub use self::builder::Builder;
pub use self::conn::TlsPolicy;
pub use self::error::Error;
pub use self::navigator::{Navigation, Navigator};
pub use self::redirect::{redirect_target, Resolved, DEFAULT_MAX_REDIRECTS};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The number of redirects followed before the last redirect response
    /// is returned to the caller.
    pub max_redirects: usize,

    /// Deadline for a whole request, across every redirect hop.
    pub timeout: Option<Duration>,

    /// Fail a connection if no data arrives for this long.
    pub read_timeout: Option<Duration>,

    /// Fail a connection once its response grows past this many bytes.
    /// Unlimited by default.
    pub max_response_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: Some(Duration::from_secs(30)),
            read_timeout: Some(Duration::from_secs(30)),
            max_response_size: None,
        }
    }
}

/// Inner type shared by clones of a client.
struct ClientRef<T> {
    connector: Connector<T>,
    config: Config,
}

/// A high-level async Gemini client.
///
/// Cloning a client is cheap, and clones share their configuration. No
/// connection state is shared: every request, and every hop of a redirect
/// chain, opens and closes its own connection.
///
/// # Example
/// ```no_run
/// # use gemdrive::{Client, TlsPolicy};
/// # async fn run() -> Result<(), gemdrive::Error> {
/// let client = Client::builder(TlsPolicy::AcceptAny).build()?;
/// let resolved = client.get("gemini://geminiprotocol.net/").await?;
/// println!("{} {}", resolved.response().status(), resolved.url());
/// # Ok(())
/// # }
/// ```
pub struct Client<T = TlsTransport<TcpTransport>> {
    inner: Arc<ClientRef<T>>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Client {
    /// Create a new builder for TCP clients, validating certificates with
    /// the given policy.
    pub fn builder(policy: TlsPolicy) -> Builder<TcpTransport> {
        Builder::new(policy)
    }
}

impl<T> Client<T> {
    /// Create a client from a transport.
    ///
    /// The transport is responsible for TLS. It is much easier to use the
    /// builder interface to create a client.
    pub fn new(transport: T, config: Config) -> Self {
        let connector = Connector::new(transport)
            .with_read_timeout(config.read_timeout)
            .with_max_response_size(config.max_response_size);
        Self {
            inner: Arc::new(ClientRef { connector, config }),
        }
    }

    /// The configuration of this client.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The connector used for each individual request.
    pub fn connector(&self) -> &Connector<T> {
        &self.inner.connector
    }
}

impl<T> Client<T>
where
    T: Transport,
{
    /// Request a URL, following redirects.
    ///
    /// Cancelling `cancel` stops the request at its next suspension point,
    /// closing any open connection, and the request resolves with
    /// [`Error::Cancelled`].
    pub async fn resolve(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolved, Error> {
        let span = tracing::debug_span!("resolve", url);
        let cancel = cancel.child_token();
        let follow = redirect::follow(
            &self.inner.connector,
            url,
            self.inner.config.max_redirects,
            &cancel,
        );

        self.deadline(follow, &cancel).instrument(span).await
    }

    /// Request a URL, following redirects, without a way to cancel it.
    pub async fn get(&self, url: &str) -> Result<Resolved, Error> {
        self.resolve(url, &CancellationToken::new()).await
    }

    /// Send a single request without following redirects.
    pub async fn fetch(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response, Error> {
        let cancel = cancel.child_token();
        let fetch = self.inner.connector.fetch(request, &cancel);
        self.deadline(fetch, &cancel).await
    }

    /// Answer an input prompt from `url` with `input`, following redirects.
    pub async fn submit_input(
        &self,
        url: &str,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolved, Error> {
        let request = Request::parse(url)?.with_input(input)?;
        self.resolve(request.url().as_str(), cancel).await
    }

    async fn deadline<F, R>(&self, future: F, cancel: &CancellationToken) -> Result<R, Error>
    where
        F: std::future::Future<Output = Result<R, Error>>,
    {
        let Some(timeout) = self.inner.config.timeout else {
            return future.await;
        };

        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                debug!(timeout = ?timeout, "request timed out");
                Err(Error::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    use super::conn::DuplexTransport;
    use super::*;
    use crate::response::Status;
    use crate::stream::duplex::{self, DuplexIncoming, DuplexStream};

    assert_impl_all!(Client: Send, Sync, Clone);
    assert_impl_all!(Config: Send, Sync, Clone);

    async fn read_request(stream: &mut DuplexStream) -> String {
        let mut line = Vec::new();
        while !line.ends_with(b"\r\n") {
            let mut byte = [0u8; 1];
            if stream.read(&mut byte).await.unwrap() == 0 {
                break;
            }
            line.push(byte[0]);
        }
        String::from_utf8(line).unwrap()
    }

    fn client(config: Config) -> (Client<DuplexTransport>, DuplexIncoming) {
        let (transport, incoming) = duplex::pair();
        (
            Client::new(DuplexTransport::new(1024, transport), config),
            incoming,
        )
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_response_size, None);
    }

    #[tokio::test]
    async fn max_response_size_applies_to_every_request() {
        let (client, mut incoming) = client(Config {
            max_response_size: Some(32),
            ..Default::default()
        });

        let server = tokio::spawn(async move {
            let mut stream = incoming.accept().await.unwrap().unwrap();
            read_request(&mut stream).await;
            let _ = stream
                .write_all(b"20 text/plain\r\nthis body is longer than the limit")
                .await;
        });

        let err = client.get("gemini://example.com/").await.unwrap_err();
        assert!(err.is_transport(), "{err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn submit_input_encodes_query() {
        let _ = tracing_subscriber::fmt::try_init();

        let (client, mut incoming) = client(Config::default());
        let server = tokio::spawn(async move {
            let mut stream = incoming.accept().await.unwrap().unwrap();
            let request = read_request(&mut stream).await;
            stream.write_all(b"20 text/gemini\r\nfound").await.unwrap();
            request
        });

        let resolved = client
            .submit_input(
                "gemini://example.com/search?old",
                "two words",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(resolved.response().status(), Status::SUCCESS);
        assert_eq!(
            server.await.unwrap(),
            "gemini://example.com/search?two%20words\r\n"
        );
    }

    #[tokio::test]
    async fn fetch_does_not_follow_redirects() {
        let (client, mut incoming) = client(Config::default());
        let server = tokio::spawn(async move {
            let mut stream = incoming.accept().await.unwrap().unwrap();
            read_request(&mut stream).await;
            stream.write_all(b"30 /elsewhere\r\n").await.unwrap();
        });

        let request = Request::parse("gemini://example.com/").unwrap();
        let response = client
            .fetch(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status(), Status::REDIRECT_TEMPORARY);
        assert_eq!(response.redirect_target(), Some("/elsewhere"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn deadline_elapses() {
        let (client, mut incoming) = client(Config {
            timeout: Some(Duration::from_millis(50)),
            read_timeout: None,
            ..Default::default()
        });

        let server = tokio::spawn(async move {
            let mut stream = incoming.accept().await.unwrap().unwrap();
            read_request(&mut stream).await;
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).await.unwrap();
        });

        let err = client.get("gemini://example.com/").await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn invalid_url_makes_no_connection() {
        let (client, mut incoming) = client(Config::default());

        let err = client.get("not a url").await.unwrap_err();
        assert!(err.is_invalid_url(), "{err:?}");

        drop(client);
        assert!(incoming.accept().await.is_none());
    }
}
