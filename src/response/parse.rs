//! Framing of a complete response buffer into a [`Response`].
//!
//! A response is `<2-digit-status><SP><meta>\r\n<body>`, and ends when the
//! server closes the connection. The parser is only handed the buffer once
//! that has happened, so it never has to deal with partial input.

use bytes::Bytes;
use thiserror::Error;

use super::status::{InvalidStatus, Status};
use super::Response;

const CRLF: &[u8] = b"\r\n";

/// The bytes received could not be framed into a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MalformedResponse {
    /// No CRLF terminates the header line.
    #[error("response header is not terminated by CRLF")]
    MissingCrlf,

    /// The header line is not valid UTF-8.
    #[error("response header is not valid UTF-8: {0}")]
    InvalidHeaderEncoding(#[source] std::str::Utf8Error),

    /// The header line is shorter than a status code.
    #[error("response header is too short to contain a status code")]
    HeaderTooShort,

    /// The first two characters of the header are not decimal digits.
    #[error("response status {0:?} is not a two digit number")]
    InvalidStatus(String),

    /// The status code is a number, but outside of `10..=69`.
    #[error("response status {0} is out of range")]
    StatusOutOfRange(u8),
}

impl From<InvalidStatus> for MalformedResponse {
    fn from(error: InvalidStatus) -> Self {
        MalformedResponse::StatusOutOfRange(error.0)
    }
}

/// Parse the complete bytes of a response.
///
/// The meta line is everything after the status code and one separator
/// character. A header with nothing after the separator (or no separator at
/// all) has an empty meta line. Bytes after the header CRLF form the body;
/// when there are none, the response has no body.
pub fn parse(buffer: Bytes) -> Result<Response, MalformedResponse> {
    let end = buffer
        .windows(CRLF.len())
        .position(|window| window == CRLF)
        .ok_or(MalformedResponse::MissingCrlf)?;

    let header =
        std::str::from_utf8(&buffer[..end]).map_err(MalformedResponse::InvalidHeaderEncoding)?;

    let mut chars = header.char_indices();
    let status = match (chars.next(), chars.next()) {
        (Some((_, tens)), Some((_, units))) => status_from_digits(tens, units)?,
        _ => return Err(MalformedResponse::HeaderTooShort),
    };

    // Skip the separator; whatever it is, it is not part of the meta line.
    let meta = match chars.nth(1) {
        Some((index, _)) => header[index..].to_owned(),
        None => String::new(),
    };

    let body_start = end + CRLF.len();
    let body = if body_start < buffer.len() {
        Some(buffer.slice(body_start..))
    } else {
        None
    };

    Ok(Response::new(status, meta, body))
}

fn status_from_digits(tens: char, units: char) -> Result<Status, MalformedResponse> {
    match (tens.to_digit(10), units.to_digit(10)) {
        (Some(tens), Some(units)) => {
            let code = (tens * 10 + units) as u8;
            Ok(Status::from_u8(code)?)
        }
        _ => Err(MalformedResponse::InvalidStatus(format!("{tens}{units}"))),
    }
}
