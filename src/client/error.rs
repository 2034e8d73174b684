use std::time::Duration;

use thiserror::Error;

use crate::request::InvalidUrl;
use crate::response::MalformedResponse;
use crate::BoxError;

/// Client error type.
///
/// Every failure propagates to the caller unchanged: nothing is retried and
/// nothing is swallowed. A redirect chain which exceeds the hop limit is not
/// an error; the last redirect response is returned instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The URL could not be parsed, has no host, or is too long to send.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] InvalidUrl),

    /// Connecting, the TLS handshake, or reading and writing the stream failed.
    #[error("transport: {0}")]
    Transport(#[source] BoxError),

    /// The server replied, but the reply could not be framed into a response.
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] MalformedResponse),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The request did not finish within the configured deadline.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl Error {
    pub(crate) fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(error.into())
    }

    /// Returns true if the request was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns true if the request hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true if the server could not be reached or the stream failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns true if the server replied with something that is not a response.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedResponse(_))
    }

    /// Returns true if the URL was rejected before any connection was made.
    pub fn is_invalid_url(&self) -> bool {
        matches!(self, Error::InvalidUrl(_))
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(Error: std::error::Error, Send, Sync, Into<BoxError>);

    #[test]
    fn display() {
        assert_eq!(Error::Cancelled.to_string(), "request cancelled");
        assert_eq!(
            Error::Timeout(Duration::from_millis(1500)).to_string(),
            "request timed out after 1500ms"
        );
        assert_eq!(
            Error::from(MalformedResponse::MissingCrlf).to_string(),
            "malformed response: response header is not terminated by CRLF"
        );
    }

    #[test]
    fn predicates() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Cancelled.is_transport());
        assert!(Error::transport("boom").is_transport());
        assert!(Error::from(InvalidUrl::MissingHost).is_invalid_url());
    }
}
