//! Requests: a single absolute URL, sent once as `<url>\r\n`.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

/// The scheme this client speaks natively.
pub const SCHEME: &str = "gemini";

/// The port used when a URL does not name one.
pub const DEFAULT_PORT: u16 = 1965;

/// The longest URL a server is required to accept, in bytes.
pub const MAX_URL_LENGTH: usize = 1024;

/// Characters left unescaped in user input: RFC 3986 unreserved.
const INPUT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A URL which cannot be requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidUrl {
    /// The string is not a URL.
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    /// The URL has no host to connect to.
    #[error("missing host")]
    MissingHost,

    /// The URL is longer than servers are required to accept.
    #[error("url is {length} bytes, the limit is {MAX_URL_LENGTH}")]
    TooLong {
        /// The length of the URL, in bytes.
        length: usize,
    },
}

/// The address a transport should connect to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    host: Box<str>,
    port: u16,
}

impl Target {
    /// Create a target from a host name (or IP address) and port.
    pub fn new(host: impl Into<Box<str>>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The host name, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// A validated request.
///
/// Requests are never persisted; one is built for each hop of a redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: Url,
    target: Target,
}

impl Request {
    /// Build a request for a URL.
    pub fn new(url: Url) -> Result<Self, InvalidUrl> {
        let host = url.host_str().ok_or(InvalidUrl::MissingHost)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(InvalidUrl::MissingHost);
        }

        let length = url.as_str().len();
        if length > MAX_URL_LENGTH {
            return Err(InvalidUrl::TooLong { length });
        }

        let port = url.port().unwrap_or(DEFAULT_PORT);
        let target = Target::new(host, port);
        Ok(Self { url, target })
    }

    /// Parse a URL string and build a request for it.
    pub fn parse(url: &str) -> Result<Self, InvalidUrl> {
        Self::new(Url::parse(url)?)
    }

    /// Build the follow-up request answering an input prompt.
    ///
    /// The input becomes the (percent-encoded) query of this request's URL,
    /// replacing any query it already had.
    pub fn with_input(&self, input: &str) -> Result<Self, InvalidUrl> {
        let mut url = self.url.clone();
        let query = utf8_percent_encode(input, INPUT).to_string();
        url.set_query(Some(&query));
        Self::new(url)
    }

    /// The URL being requested.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The address to connect to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The host to connect to.
    pub fn host(&self) -> &str {
        self.target.host()
    }

    /// The port to connect to.
    pub fn port(&self) -> u16 {
        self.target.port()
    }

    /// The exact bytes written to the server: the URL followed by CRLF.
    pub fn line(&self) -> Vec<u8> {
        let url = self.url.as_str();
        let mut line = Vec::with_capacity(url.len() + 2);
        line.extend_from_slice(url.as_bytes());
        line.extend_from_slice(b"\r\n");
        line
    }

    /// Consume the request, returning its URL.
    pub fn into_url(self) -> Url {
        self.url
    }
}

impl TryFrom<Url> for Request {
    type Error = InvalidUrl;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        Request::new(url)
    }
}

impl TryFrom<&str> for Request {
    type Error = InvalidUrl;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        Request::parse(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port() {
        let request = Request::parse("gemini://example.com/").unwrap();
        assert_eq!(request.host(), "example.com");
        assert_eq!(request.port(), 1965);
        assert_eq!(request.line(), b"gemini://example.com/\r\n");
    }

    #[test]
    fn explicit_port() {
        let request = Request::parse("gemini://example.com:1966/path?q").unwrap();
        assert_eq!(request.target(), &Target::new("example.com", 1966));
        assert_eq!(request.line(), b"gemini://example.com:1966/path?q\r\n");
    }

    #[test]
    fn ipv6_host() {
        let request = Request::parse("gemini://[::1]:1965/").unwrap();
        assert_eq!(request.host(), "::1");
        assert_eq!(request.target().to_string(), "[::1]:1965");
    }

    #[test]
    fn missing_host() {
        assert_eq!(
            Request::parse("gemini:/just/a/path").unwrap_err(),
            InvalidUrl::MissingHost
        );
        assert_eq!(
            Request::parse("mailto:someone@example.com").unwrap_err(),
            InvalidUrl::MissingHost
        );
    }

    #[test]
    fn unparseable() {
        assert!(matches!(
            Request::parse("not a url").unwrap_err(),
            InvalidUrl::Parse(_)
        ));
    }

    #[test]
    fn length_limit() {
        let base = "gemini://example.com/";
        let exact = format!("{base}{}", "a".repeat(MAX_URL_LENGTH - base.len()));
        assert!(Request::parse(&exact).is_ok());

        let over = format!("{exact}a");
        assert_eq!(
            Request::parse(&over).unwrap_err(),
            InvalidUrl::TooLong {
                length: MAX_URL_LENGTH + 1
            }
        );
    }

    #[test]
    fn input_is_percent_encoded() {
        let request = Request::parse("gemini://example.com/search?old").unwrap();
        let answered = request.with_input("rust & tokio/1.0").unwrap();
        assert_eq!(
            answered.url().as_str(),
            "gemini://example.com/search?rust%20%26%20tokio%2F1.0"
        );
    }

    #[test]
    fn input_revalidates_length() {
        let request = Request::parse("gemini://example.com/").unwrap();
        let input = "x".repeat(MAX_URL_LENGTH);
        assert!(matches!(
            request.with_input(&input).unwrap_err(),
            InvalidUrl::TooLong { .. }
        ));
    }
}
