//! Parsed responses.
//!
//! A [`Response`] is built exactly once, by [`parse`], from the complete bytes
//! the server sent before closing the connection. It is immutable afterwards.
//! How the meta line is interpreted depends on the [`Category`] of the status:
//! a media type for success, a prompt for input, a URL for redirects and a
//! human readable message for failures.

use std::borrow::Cow;

use bytes::Bytes;

mod media;
mod parse;
mod status;

pub use self::media::{MediaType, DEFAULT_MEDIA_TYPE};
pub use self::parse::{parse, MalformedResponse};
pub use self::status::{Category, InvalidStatus, Status};

/// A response to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    meta: String,
    body: Option<Bytes>,
}

impl Response {
    /// Assemble a response from its parts.
    pub fn new(status: Status, meta: impl Into<String>, body: Option<Bytes>) -> Self {
        Self {
            status,
            meta: meta.into(),
            body,
        }
    }

    /// The response status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The category of the response status.
    pub fn category(&self) -> Category {
        self.status.category()
    }

    /// The meta line, which may be empty.
    pub fn meta(&self) -> &str {
        &self.meta
    }

    /// The raw body, if the server sent any bytes after the header.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Consume the response, returning the raw body.
    pub fn into_body(self) -> Option<Bytes> {
        self.body
    }

    /// Split the response into status, meta and body.
    pub fn into_parts(self) -> (Status, String, Option<Bytes>) {
        (self.status, self.meta, self.body)
    }

    /// The media type of a success response.
    ///
    /// An empty meta line means `text/gemini; charset=utf-8`.
    pub fn media_type(&self) -> Option<MediaType> {
        if !self.status.is_success() {
            return None;
        }

        let meta = self.meta.trim();
        if meta.is_empty() {
            MediaType::parse(DEFAULT_MEDIA_TYPE)
        } else {
            MediaType::parse(meta)
        }
    }

    /// The body of a successful `text/*` response, decoded as UTF-8.
    ///
    /// Invalid sequences are replaced rather than rejected. A text response
    /// without a body decodes to an empty string.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        let media = self.media_type()?;
        if !media.is_text() {
            return None;
        }

        match &self.body {
            Some(body) => Some(String::from_utf8_lossy(body)),
            None => Some(Cow::Borrowed("")),
        }
    }

    /// The prompt to show the user, for an input response.
    pub fn prompt(&self) -> Option<&str> {
        self.status.is_input().then_some(self.meta.as_str())
    }

    /// Returns true if the server asked for input that should not be echoed.
    pub fn is_sensitive_input(&self) -> bool {
        self.status == Status::SENSITIVE_INPUT
    }

    /// The raw redirect target, for a redirect response.
    ///
    /// This may be relative to the URL which produced the response.
    pub fn redirect_target(&self) -> Option<&str> {
        self.status.is_redirect().then_some(self.meta.as_str())
    }

    /// Returns true if the redirect should be considered permanent.
    pub fn is_permanent_redirect(&self) -> bool {
        self.status == Status::REDIRECT_PERMANENT
    }
}
