//! Error types.
//!
//! Two families live here and they never mix:
//!
//! - [`Error`]: a value object refused its input, or the server could not
//!   bind/accept.
//! - [`Failure`]: a pipeline participant gave up on the current request.
//!   The [`Controller`](crate::Controller) turns every `Failure` into an
//!   [`Outcome`](crate::Outcome) or, as a last resort, a minimal response.
//!   Callers of `handle` never see one.

use thiserror::Error;

/// The error type returned by stanza's fallible constructors and mutators.
#[derive(Debug, Error)]
pub enum Error {
    /// A URI component violates its RFC 3986 production.
    #[error("'{value}' is not a valid {component}.")]
    InvalidUri {
        component: &'static str,
        value: String,
    },

    /// A header field name or value violates the RFC 7230 field grammar.
    #[error("'{value}' is not a valid header {part}.")]
    InvalidHeader { part: &'static str, value: String },

    #[error("'{0}' is not a valid method.")]
    InvalidMethod(String),

    #[error("'{0}' is not a valid protocol.")]
    InvalidProtocol(String),

    #[error("'{0}' is not a valid status code.")]
    InvalidStatus(u16),

    #[error("'{0}' is not a valid reason phrase.")]
    InvalidReason(String),

    #[error("'{0}' is not a valid request target.")]
    InvalidRequestTarget(String),

    /// Message bodies are read-only.
    #[error("stream is not writable")]
    NotWritable,

    #[error("invalid socket address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the pipeline stopped processing a request.
///
/// Every variant maps onto an HTTP status via [`Failure::status`]:
///
/// | Variant | Status |
/// |---|---|
/// | `AccessDenied` | 403 |
/// | `Delayed` | 204 |
/// | `Unavailable` | 400 |
/// | `InvalidBody`, `NoRequester`, `NoProcessor`, `NoResponder`, `UnhandledResponse` | 500 |
/// | `Cors` | 401 unless overridden |
/// | `Error` | its own code, 500 when zero |
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Failure {
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Delayed(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    InvalidBody(String),

    #[error("No available requester.")]
    NoRequester,

    #[error("No available processor.")]
    NoProcessor,

    #[error("No available responder.")]
    NoResponder,

    #[error("{0}")]
    UnhandledResponse(String),

    #[error("{message}")]
    Cors { status: u16, message: String },

    #[error("{message}")]
    Error { code: u16, message: String },
}

impl Failure {
    /// A CORS policy rejection with the default `401` status.
    pub fn cors(message: impl Into<String>) -> Self {
        Self::Cors { status: 401, message: message.into() }
    }

    /// A generic failure. A zero `code` reports as `500`.
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error { code, message: message.into() }
    }

    /// The HTTP status this failure surfaces as.
    pub fn status(&self) -> u16 {
        match self {
            Self::AccessDenied(_) => 403,
            Self::Delayed(_) => 204,
            Self::Unavailable(_) => 400,
            Self::InvalidBody(_)
            | Self::NoRequester
            | Self::NoProcessor
            | Self::NoResponder
            | Self::UnhandledResponse(_) => 500,
            Self::Cors { status, .. } => *status,
            Self::Error { code: 0, .. } => 500,
            Self::Error { code, .. } => *code,
        }
    }
}

/// Lets collaborators use `?` on message mutators.
impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        Self::Error { code: 500, message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(Failure::AccessDenied("no".into()).status(), 403);
        assert_eq!(Failure::Delayed("later".into()).status(), 204);
        assert_eq!(Failure::Unavailable("gone".into()).status(), 400);
        assert_eq!(Failure::InvalidBody("bad".into()).status(), 500);
        assert_eq!(Failure::NoResponder.status(), 500);
        assert_eq!(Failure::cors("origin").status(), 401);
        assert_eq!(Failure::error(0, "boom").status(), 500);
        assert_eq!(Failure::error(418, "teapot").status(), 418);
    }

    #[test]
    fn value_errors_become_generic_failures() {
        let failure = Failure::from(Error::InvalidMethod("BREW".into()));
        assert_eq!(failure.status(), 500);
        assert_eq!(failure.to_string(), "'BREW' is not a valid method.");
    }

    #[test]
    fn missing_collaborators_carry_fixed_messages() {
        assert_eq!(Failure::NoRequester.to_string(), "No available requester.");
        assert_eq!(Failure::NoProcessor.to_string(), "No available processor.");
    }
}
