//! A single active view, navigated from one URL to the next.
//!
//! A [`Navigator`] owns at most one request at a time. Navigating elsewhere
//! cancels the current request and waits for its task to finish, so the
//! old connection is closed before the new one is opened. The same holds
//! after [`Navigator::cancel`]: the cancelled task is kept until the next
//! navigation has waited for it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument as _};

use super::conn::{TcpTransport, TlsTransport, Transport};
use super::{Client, Error, Resolved};

struct Active {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Supervises navigation for a single view.
///
/// # Example
/// ```no_run
/// # use gemdrive::client::Navigator;
/// # use gemdrive::{Client, TlsPolicy};
/// # async fn run() -> Result<(), gemdrive::Error> {
/// let navigator = Navigator::new(Client::builder(TlsPolicy::AcceptAny).build()?);
///
/// let first = navigator.navigate("gemini://example.com/slow");
/// let second = navigator.navigate("gemini://example.com/");
///
/// assert!(first.await.unwrap_err().is_cancelled());
/// let page = second.await?;
/// # Ok(())
/// # }
/// ```
pub struct Navigator<T = TlsTransport<TcpTransport>> {
    client: Client<T>,
    active: Mutex<Option<Active>>,
}

impl<T> fmt::Debug for Navigator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("client", &self.client)
            .field("active", &self.active.lock().is_some())
            .finish()
    }
}

impl<T> Navigator<T> {
    /// Create a navigator which makes requests with `client`.
    pub fn new(client: Client<T>) -> Self {
        Self {
            client,
            active: Mutex::new(None),
        }
    }

    /// The client used for navigation.
    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Cancel the current navigation, if any.
    ///
    /// Its [`Navigation`] resolves with [`Error::Cancelled`]. The next call
    /// to [`Navigator::navigate`] does not connect until the cancelled
    /// navigation has closed its connection.
    pub fn cancel(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            if !active.cancel.is_cancelled() {
                debug!("navigation cancelled");
                active.cancel.cancel();
            }
        }
    }
}

impl<T> Navigator<T>
where
    T: Transport,
{
    /// Navigate to `url`, superseding the current navigation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn navigate(&self, url: impl Into<String>) -> Navigation {
        let url = url.into();
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        let mut active = self.active.lock();
        let previous = active.take();
        if let Some(previous) = &previous {
            if !previous.cancel.is_cancelled() {
                debug!("superseding navigation");
                previous.cancel.cancel();
            }
        }

        let client = self.client.clone();
        let token = cancel.clone();
        let span = tracing::debug_span!("navigate", %url);
        let handle = tokio::spawn(
            async move {
                if let Some(previous) = previous {
                    if let Err(error) = previous.handle.await {
                        if error.is_panic() {
                            warn!("previous navigation panicked");
                        }
                    }
                }

                let result = client.resolve(&url, &token).await;
                if tx.send(result).is_err() {
                    debug!("navigation result dropped");
                }
            }
            .instrument(span),
        );

        *active = Some(Active {
            cancel: cancel.clone(),
            handle,
        });

        Navigation {
            receiver: rx,
            cancel,
        }
    }
}

// Nothing navigates after a drop, so only the token is cancelled.
impl<T> Drop for Navigator<T> {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

/// The eventual result of [`Navigator::navigate`].
///
/// Dropping a `Navigation` does not cancel it; use [`Navigation::cancel`]
/// or [`Navigator::cancel`].
#[derive(Debug)]
#[must_use = "navigations do nothing observable unless awaited"]
pub struct Navigation {
    receiver: oneshot::Receiver<Result<Resolved, Error>>,
    cancel: CancellationToken,
}

impl Navigation {
    /// Cancel this navigation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if this navigation was cancelled or superseded.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Future for Navigation {
    type Output = Result<Resolved, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) if self.cancel.is_cancelled() => {
                Poll::Ready(Err(Error::Cancelled))
            }
            Poll::Ready(Err(_)) => {
                warn!("navigation task ended without a result");
                Poll::Ready(Err(Error::transport(
                    "navigation task ended without a result",
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
