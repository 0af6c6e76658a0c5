//! The outcome of domain processing, before it is rendered.

use bytes::Bytes;

use crate::error::Failure;

/// What a [`Requester`](crate::Requester) extracts and an [`Outcome`]
/// carries.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Json(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Wire form: text as UTF-8, JSON serialized compactly.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Text(text) => Bytes::from(text.clone()),
            Self::Bytes(bytes) => bytes.clone(),
            Self::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Payload {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self { Self::Bytes(b) }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self { Self::Bytes(Bytes::from(v)) }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self { Self::Json(v) }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// An immutable `(status, payload)` pair.
///
/// The status comes from a small vocabulary: [`COMPLETE`](Self::COMPLETE),
/// [`DELAYED`](Self::DELAYED), [`ACCESS`](Self::ACCESS),
/// [`UNAVAILABLE`](Self::UNAVAILABLE), [`ERROR`](Self::ERROR), or the explicit
/// code of an [`exception`](Self::exception).
///
/// ```rust
/// use stanza::Outcome;
///
/// assert_eq!(Outcome::exception(0, "msg").status(), 500);
/// assert_eq!(Outcome::exception(403, "msg").status(), 403);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    status: u16,
    payload: Payload,
}

impl Outcome {
    pub const COMPLETE: u16 = 200;
    pub const DELAYED: u16 = 204;
    pub const UNAVAILABLE: u16 = 400;
    pub const ACCESS: u16 = 403;
    pub const ERROR: u16 = 500;

    pub fn complete(payload: impl Into<Payload>) -> Self {
        Self { status: Self::COMPLETE, payload: payload.into() }
    }

    pub fn delayed(payload: impl Into<Payload>) -> Self {
        Self { status: Self::DELAYED, payload: payload.into() }
    }

    pub fn access(payload: impl Into<Payload>) -> Self {
        Self { status: Self::ACCESS, payload: payload.into() }
    }

    pub fn unavailable(payload: impl Into<Payload>) -> Self {
        Self { status: Self::UNAVAILABLE, payload: payload.into() }
    }

    /// A failed outcome with an explicit status. Zero means [`ERROR`](Self::ERROR).
    pub fn exception(code: u16, payload: impl Into<Payload>) -> Self {
        let status = if code == 0 { Self::ERROR } else { code };
        Self { status, payload: payload.into() }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// `true` for [`COMPLETE`](Self::COMPLETE) and [`DELAYED`](Self::DELAYED).
    pub fn is_success(&self) -> bool {
        matches!(self.status, Self::COMPLETE | Self::DELAYED)
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        let message = failure.to_string();
        match failure {
            Failure::AccessDenied(_) => Self::access(message),
            Failure::Delayed(_) => Self::delayed(message),
            Failure::Unavailable(_) => Self::unavailable(message),
            other => Self::exception(other.status(), message),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_vocabulary() {
        assert_eq!(Outcome::complete("ok").status(), 200);
        assert_eq!(Outcome::delayed("later").status(), 204);
        assert_eq!(Outcome::access("no").status(), 403);
        assert_eq!(Outcome::unavailable("gone").status(), 400);
        assert_eq!(Outcome::exception(0, "msg").status(), 500);
        assert_eq!(Outcome::exception(403, "msg").status(), 403);
    }

    #[test]
    fn failures_map_onto_outcomes() {
        let outcome = Outcome::from(Failure::AccessDenied("Access denied".into()));
        assert_eq!(outcome.status(), 403);
        assert_eq!(outcome.payload().as_text(), Some("Access denied"));

        let outcome = Outcome::from(Failure::InvalidBody("Test Body".into()));
        assert_eq!(outcome.status(), 500);
        assert_eq!(outcome.payload().as_text(), Some("Test Body"));

        assert_eq!(Outcome::from(Failure::cors("origin")).status(), 401);
        assert_eq!(Outcome::from(Failure::error(0, "x")).status(), 500);
        assert!(!Outcome::from(Failure::NoProcessor).is_success());
    }

    #[test]
    fn payload_wire_form() {
        assert_eq!(Payload::from(json!({"id": 1})).to_bytes(), r#"{"id":1}"#);
        assert_eq!(Payload::from("text").to_bytes(), "text");
        assert!(Payload::Empty.is_empty());
        assert!(Payload::from(Vec::<u8>::new()).is_empty());
    }
}
