//! The behaviour shared by [`Request`](crate::Request) and
//! [`Response`](crate::Response).
//!
//! Both carry a protocol version, a header map and a body. Every `with_*`
//! method returns a modified copy and leaves the receiver untouched:
//!
//! ```rust
//! use stanza::{Message, Response};
//!
//! let plain = Response::new();
//! let tagged = plain.with_header("X-Trace", "abc").unwrap();
//! assert!(!plain.has_header("X-Trace"));
//! assert_eq!(tagged.header_line("X-Trace"), "abc");
//! ```

use crate::error::Error;
use crate::headers::Headers;
use crate::stream::Stream;

/// Protocol version used when none is given.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

// ── Head ──────────────────────────────────────────────────────────────────────

/// Fields common to every message.
///
/// `#[doc(hidden)] pub` because it appears in the sealed supertrait of
/// [`Message`]. Nothing outside this crate can construct or use it.
#[doc(hidden)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Head {
    pub(crate) version: String,
    pub(crate) headers: Headers,
    pub(crate) body: Stream,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            version: DEFAULT_PROTOCOL_VERSION.to_owned(),
            headers: Headers::new(),
            body: Stream::default(),
        }
    }
}

pub(crate) mod private {
    pub trait Sealed {
        fn head(&self) -> &super::Head;
        fn head_mut(&mut self) -> &mut super::Head;
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// An immutable HTTP message.
///
/// Sealed: implemented by [`Request`](crate::Request) and
/// [`Response`](crate::Response) only.
pub trait Message: private::Sealed + Clone {
    /// `"1.1"`, `"2.0"`, …
    fn protocol_version(&self) -> &str {
        &self.head().version
    }

    fn headers(&self) -> &Headers {
        &self.head().headers
    }

    /// Case-sensitive.
    fn has_header(&self, name: &str) -> bool {
        self.head().headers.contains(name)
    }

    /// Every value of `name`, or an empty slice.
    fn header(&self, name: &str) -> &[String] {
        self.head().headers.get(name)
    }

    /// Every value of `name` joined with `", "`.
    fn header_line(&self, name: &str) -> String {
        self.head().headers.line(name)
    }

    fn body(&self) -> &Stream {
        &self.head().body
    }

    /// Accepts `major.minor`. An empty string resets to
    /// [`DEFAULT_PROTOCOL_VERSION`].
    fn with_protocol_version(&self, version: &str) -> Result<Self, Error> {
        let version = validate_protocol(version)?;
        let mut next = self.clone();
        next.head_mut().version = version;
        Ok(next)
    }

    /// Replaces every value of `name` with `value`.
    fn with_header(&self, name: &str, value: impl Into<String>) -> Result<Self, Error> {
        self.with_header_values(name, [value])
    }

    /// Replaces every value of `name`.
    fn with_header_values<I>(&self, name: &str, values: I) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut next = self.clone();
        next.head_mut().headers.set(name, values.into_iter().map(Into::into).collect())?;
        Ok(next)
    }

    /// Appends `value` to whatever `name` already holds.
    fn with_added_header(&self, name: &str, value: impl Into<String>) -> Result<Self, Error> {
        let mut next = self.clone();
        next.head_mut().headers.append(name, vec![value.into()])?;
        Ok(next)
    }

    fn without_header(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.head_mut().headers.remove(name);
        next
    }

    fn with_body(&self, body: impl Into<Stream>) -> Self {
        let mut next = self.clone();
        next.head_mut().body = body.into();
        next
    }
}

/// `HTTP-version = DIGIT+ "." DIGIT+`
pub(crate) fn validate_protocol(version: &str) -> Result<String, Error> {
    if version.is_empty() {
        return Ok(DEFAULT_PROTOCOL_VERSION.to_owned());
    }
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match version.split_once('.') {
        Some((major, minor)) if digits(major) && digits(minor) => Ok(version.to_owned()),
        _ => Err(Error::InvalidProtocol(version.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_versions() {
        assert_eq!(validate_protocol("1.0").unwrap(), "1.0");
        assert_eq!(validate_protocol("2.0").unwrap(), "2.0");
        assert_eq!(validate_protocol("").unwrap(), "1.1");
        assert!(validate_protocol("1").is_err());
        assert!(validate_protocol("1.").is_err());
        assert!(validate_protocol("HTTP/1.1").is_err());
        assert!(validate_protocol("1.1.1").is_err());
    }
}
