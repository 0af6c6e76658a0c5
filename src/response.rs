//! Outbound HTTP response value and the [`ContentType`] shortcuts.

use std::fmt;

use http::StatusCode;

use crate::error::Error;
use crate::message::{Head, Message, private};
use crate::stream::Stream;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::with_content`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An immutable HTTP response.
///
/// # Shortcuts
///
/// ```rust
/// use stanza::{ContentType, Message, Response};
///
/// Response::text("hello");
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::new().with_content(ContentType::Xml, "<ok/>");
/// ```
///
/// # Custom status
///
/// ```rust
/// use stanza::{Message, Response};
///
/// let created = Response::new()
///     .with_status(201, "")
///     .unwrap()
///     .with_header("Location", "/users/42")
///     .unwrap();
/// assert_eq!(created.reason_phrase(), "Created");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    head: Head,
    status: u16,
    reason: String,
}

impl Response {
    /// `200 OK`, no headers, empty body.
    pub fn new() -> Self {
        Self::from_status(StatusCode::OK)
    }

    pub fn from_status(status: StatusCode) -> Self {
        Self {
            head: Head::default(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
        }
    }

    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new().with_content(ContentType::Text, body.into())
    }

    /// `200 OK` with an `application/json` body.
    pub fn json(body: Vec<u8>) -> Self {
        Self::new().with_content(ContentType::Json, body)
    }

    /// The fallback response: `status` (500 when out of range) with
    /// `message` as a plain-text body. Never fails.
    pub fn failure(status: u16, message: &str) -> Self {
        let status = StatusCode::from_u16(status)
            .ok()
            .filter(|s| (100..=599).contains(&s.as_u16()))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Self::from_status(status);
        response.head.headers.replace("Content-Type", vec![ContentType::Text.as_str().to_owned()]);
        response.head.body = Stream::new(message.to_owned());
        response
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Sets the status. An empty `reason` picks the canonical phrase for
    /// `code` (or none for unregistered codes).
    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self, Error> {
        if !(100..=599).contains(&code) {
            return Err(Error::InvalidStatus(code));
        }
        let reason = if reason.is_empty() {
            StatusCode::from_u16(code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_owned()
        } else {
            validate_reason(reason)?
        };
        let mut next = self.clone();
        next.status = code;
        next.reason = reason;
        Ok(next)
    }

    /// Replaces the body and sets `Content-Type` to match.
    pub fn with_content(&self, content_type: ContentType, body: impl Into<Stream>) -> Self {
        let mut next = self.with_body(body);
        next.head.headers.replace("Content-Type", vec![content_type.as_str().to_owned()]);
        next
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

impl private::Sealed for Response {
    fn head(&self) -> &Head { &self.head }
    fn head_mut(&mut self) -> &mut Head { &mut self.head }
}

impl Message for Response {}

/// The status line, e.g. `HTTP/1.1 404 Not Found`.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{} {}", self.head.version, self.status)?;
        if !self.reason.is_empty() {
            write!(f, " {}", self.reason)?;
        }
        Ok(())
    }
}

/// `reason-phrase = *( HTAB / SP / VCHAR / obs-text )`
fn validate_reason(reason: &str) -> Result<String, Error> {
    let valid = reason
        .bytes()
        .all(|b| b == b'\t' || b == b' ' || (0x21..=0x7e).contains(&b) || b >= 0x80);
    if valid { Ok(reason.to_owned()) } else { Err(Error::InvalidReason(reason.to_owned())) }
}
