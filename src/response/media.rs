//! Media types carried in the meta line of success responses.

use std::fmt;

/// The media type assumed when a success response has an empty meta line.
pub const DEFAULT_MEDIA_TYPE: &str = "text/gemini; charset=utf-8";

/// A parsed `type/subtype; name=value` media type.
///
/// Type, subtype and parameter names are compared case-insensitively.
/// Parameter values keep their original case, with surrounding quotes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    primary: String,
    sub: String,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a media type, returning `None` if there is no `type/subtype`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let essence = parts.next()?.trim();
        let (primary, sub) = essence.split_once('/')?;
        let (primary, sub) = (primary.trim(), sub.trim());
        if primary.is_empty() || sub.is_empty() {
            return None;
        }

        let parameters = parts
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some((name.to_ascii_lowercase(), value.to_owned()))
            })
            .collect();

        Some(Self {
            primary: primary.to_ascii_lowercase(),
            sub: sub.to_ascii_lowercase(),
            parameters,
        })
    }

    /// The primary type, e.g. `text`.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// The subtype, e.g. `gemini`.
    pub fn sub(&self) -> &str {
        &self.sub
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `charset` parameter, if present.
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// The `lang` parameter, if present.
    pub fn lang(&self) -> Option<&str> {
        self.parameter("lang")
    }

    /// Returns true for any `text/*` type.
    pub fn is_text(&self) -> bool {
        self.primary == "text"
    }

    /// Returns true for `text/gemini`.
    pub fn is_gemtext(&self) -> bool {
        self.is_text() && self.sub == "gemini"
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.sub)?;
        for (name, value) in &self.parameters {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}
