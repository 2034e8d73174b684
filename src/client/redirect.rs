//! Following redirect chains.
//!
//! Hops run strictly one after another, each over its own connection. The
//! chain is bounded by a hop limit: once that many redirects have been
//! followed, the next redirect response is returned to the caller as-is
//! rather than followed or reported as an error. Cycles are not detected
//! separately; they simply run into the limit.

use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument as _};
use url::Url;

use super::conn::{Connector, Transport};
use super::Error;
use crate::request::{Request, SCHEME};
use crate::response::{Category, Response};

/// The default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// The outcome of a request, after following any redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    response: Response,
    url: Url,
    redirects: usize,
}

impl Resolved {
    /// The final response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// The URL which produced the final response.
    ///
    /// Relative links in the response body resolve against this URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The number of redirects followed to reach this response.
    pub fn redirects(&self) -> usize {
        self.redirects
    }

    /// Returns true if the hop limit was reached, leaving a redirect unfollowed.
    pub fn is_unresolved_redirect(&self) -> bool {
        self.response.category() == Category::Redirect
    }

    /// Split into the final response and its URL.
    pub fn into_parts(self) -> (Response, Url) {
        (self.response, self.url)
    }
}

/// Work out where a redirect points.
///
/// A target that already starts with this client's scheme is used exactly
/// as sent. Anything else is resolved as a reference relative to the URL
/// that produced the redirect; if that fails, the target is used literally.
///
/// The next request parses the returned target, so the request line sent
/// for it is the normalized URL: `gemini://host/a/../b` is requested as
/// `gemini://host/b`.
pub fn redirect_target(current: &Url, meta: &str) -> String {
    if has_own_scheme(meta) {
        return meta.to_owned();
    }

    match current.join(meta) {
        Ok(url) => url.into(),
        Err(error) => {
            debug!(%error, target = meta, "unable to resolve redirect target");
            meta.to_owned()
        }
    }
}

fn has_own_scheme(target: &str) -> bool {
    target
        .split_once("://")
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case(SCHEME))
}

/// Fetch `start`, following up to `max_redirects` redirects.
pub(crate) async fn follow<T>(
    connector: &Connector<T>,
    start: &str,
    max_redirects: usize,
    cancel: &CancellationToken,
) -> Result<Resolved, Error>
where
    T: Transport,
{
    let mut depth = 0;
    let mut current = start.to_owned();

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let request = Request::parse(&current)?;
        let span = tracing::debug_span!("hop", depth, url = %request.url());
        let response = connector.fetch(&request, cancel).instrument(span).await?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if response.category() != Category::Redirect {
            return Ok(Resolved {
                response,
                url: request.into_url(),
                redirects: depth,
            });
        }

        if depth >= max_redirects {
            debug!(
                max_redirects,
                url = %request.url(),
                "redirect limit reached, returning redirect unresolved"
            );
            return Ok(Resolved {
                response,
                url: request.into_url(),
                redirects: depth,
            });
        }

        let target = redirect_target(request.url(), response.meta());
        debug!(
            status = %response.status(),
            from = %request.url(),
            to = %target,
            "following redirect"
        );

        current = target;
        depth += 1;
    }
}
