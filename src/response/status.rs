//! Status codes and their coarse categories.

use std::fmt;

/// Coarse classification of a [`Status`], derived from its tens digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    /// The server is prompting for a line of user input.
    Input = 1,

    /// The request was handled and a body follows the header.
    Success = 2,

    /// The resource lives at the URL carried in the meta line.
    Redirect = 3,

    /// The request failed, but may succeed if retried later.
    TemporaryFailure = 4,

    /// The request failed and should not be retried unchanged.
    PermanentFailure = 5,

    /// The server requires a client certificate.
    ClientCertificateRequired = 6,
}

impl Category {
    fn from_tens(tens: u8) -> Option<Self> {
        match tens {
            1 => Some(Category::Input),
            2 => Some(Category::Success),
            3 => Some(Category::Redirect),
            4 => Some(Category::TemporaryFailure),
            5 => Some(Category::PermanentFailure),
            6 => Some(Category::ClientCertificateRequired),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Input => "input",
            Category::Success => "success",
            Category::Redirect => "redirect",
            Category::TemporaryFailure => "temporary failure",
            Category::PermanentFailure => "permanent failure",
            Category::ClientCertificateRequired => "client certificate required",
        };
        f.write_str(name)
    }
}

/// A two digit response status.
///
/// Only codes in `10..=69` can be represented. Codes inside that range which
/// have no assigned meaning are still accepted, and are categorised by their
/// tens digit like any other.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(u8);

/// A status code outside of `10..=69`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status code {0} is outside of 10..=69")]
pub struct InvalidStatus(pub u8);

macro_rules! status_codes {
    ($($(#[$docs:meta])* ($code:expr, $name:ident, $reason:expr);)+) => {
        impl Status {
            $(
                $(#[$docs])*
                pub const $name: Status = Status($code);
            )+

            /// The name given to this status code, if it has one.
            pub fn canonical_reason(&self) -> Option<&'static str> {
                match self.0 {
                    $($code => Some($reason),)+
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    /// 10 Input
    (10, INPUT, "Input");
    /// 11 Sensitive Input
    (11, SENSITIVE_INPUT, "Sensitive Input");
    /// 20 Success
    (20, SUCCESS, "Success");
    /// 30 Temporary Redirect
    (30, REDIRECT_TEMPORARY, "Temporary Redirect");
    /// 31 Permanent Redirect
    (31, REDIRECT_PERMANENT, "Permanent Redirect");
    /// 40 Temporary Failure
    (40, TEMPORARY_FAILURE, "Temporary Failure");
    /// 41 Server Unavailable
    (41, SERVER_UNAVAILABLE, "Server Unavailable");
    /// 42 CGI Error
    (42, CGI_ERROR, "CGI Error");
    /// 43 Proxy Error
    (43, PROXY_ERROR, "Proxy Error");
    /// 44 Slow Down
    (44, SLOW_DOWN, "Slow Down");
    /// 50 Permanent Failure
    (50, PERMANENT_FAILURE, "Permanent Failure");
    /// 51 Not Found
    (51, NOT_FOUND, "Not Found");
    /// 52 Gone
    (52, GONE, "Gone");
    /// 53 Proxy Request Refused
    (53, PROXY_REQUEST_REFUSED, "Proxy Request Refused");
    /// 59 Bad Request
    (59, BAD_REQUEST, "Bad Request");
    /// 60 Client Certificate Required
    (60, CLIENT_CERTIFICATE_REQUIRED, "Client Certificate Required");
    /// 61 Certificate Not Authorised
    (61, CERTIFICATE_NOT_AUTHORISED, "Certificate Not Authorised");
    /// 62 Certificate Not Valid
    (62, CERTIFICATE_NOT_VALID, "Certificate Not Valid");
}

impl Status {
    /// Create a status from its numeric code.
    pub fn from_u8(code: u8) -> Result<Self, InvalidStatus> {
        if (10..=69).contains(&code) {
            Ok(Status(code))
        } else {
            Err(InvalidStatus(code))
        }
    }

    /// The numeric code.
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// The category of this status, `code / 10`.
    pub fn category(&self) -> Category {
        match Category::from_tens(self.0 / 10) {
            Some(category) => category,
            None => unreachable!("status codes are constrained to 10..=69"),
        }
    }

    /// Returns true for 1x statuses.
    pub fn is_input(&self) -> bool {
        self.category() == Category::Input
    }

    /// Returns true for 2x statuses.
    pub fn is_success(&self) -> bool {
        self.category() == Category::Success
    }

    /// Returns true for 3x statuses.
    pub fn is_redirect(&self) -> bool {
        self.category() == Category::Redirect
    }

    /// Returns true for 4x and 5x statuses.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.category(),
            Category::TemporaryFailure | Category::PermanentFailure
        )
    }
}

impl TryFrom<u8> for Status {
    type Error = InvalidStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Status::from_u8(code)
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl PartialEq<u8> for Status {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_reason() {
            Some(reason) => write!(f, "{} {}", self.0, reason),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_tens_digit() {
        for code in 10..=69u8 {
            let status = Status::from_u8(code).unwrap();
            assert_eq!(status.category() as u8, code / 10, "code {code}");
        }
    }

    #[test]
    fn out_of_range() {
        assert_eq!(Status::from_u8(9), Err(InvalidStatus(9)));
        assert_eq!(Status::from_u8(70), Err(InvalidStatus(70)));
        assert_eq!(Status::from_u8(0), Err(InvalidStatus(0)));
    }

    #[test]
    fn unassigned_codes_keep_their_category() {
        let status = Status::from_u8(27).unwrap();
        assert_eq!(status.category(), Category::Success);
        assert_eq!(status.canonical_reason(), None);
        assert_eq!(status.to_string(), "27");
    }

    #[test]
    fn display() {
        assert_eq!(Status::NOT_FOUND.to_string(), "51 Not Found");
        assert_eq!(Category::ClientCertificateRequired.to_string(), "client certificate required");
    }

    #[test]
    fn predicates() {
        assert!(Status::SENSITIVE_INPUT.is_input());
        assert!(Status::REDIRECT_PERMANENT.is_redirect());
        assert!(Status::SLOW_DOWN.is_failure());
        assert!(Status::GONE.is_failure());
        assert!(!Status::CERTIFICATE_NOT_VALID.is_failure());
        assert!(Status::SUCCESS.is_success());
    }
}
