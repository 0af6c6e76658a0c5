//! Cross-origin resource sharing.
//!
//! CORS policy is declared by the participants themselves. Any requester,
//! processor, responder or middleware may return a [`CorsCapable`] from its
//! `cors()` method; the [`Cors`] middleware merges every declaration into one
//! policy for the request at hand.
//!
//! A wildcard (`*`) from any participant makes that dimension a wildcard.
//! Under credentials the literal request origin is echoed instead of `*`.
//!
//! ```rust
//! use stanza::{Controller, Cors, CorsPolicy};
//!
//! let policy = CorsPolicy::default()
//!     .allow_origin("https://app.example.com")
//!     .allow_methods(["GET", "PUT"])
//!     .allow_headers(["X-Api-Key"]);
//!
//! let controller = Controller::builder()
//!     .cors(Cors::with_policy(policy))
//!     .build();
//! ```

mod middleware;
mod preflight;

pub use middleware::Cors;
pub use preflight::Preflight;

use serde::{Deserialize, Serialize};

use crate::headers::normalize_name;
use crate::route::Route;

pub const WILDCARD: &str = "*";

/// Response headers a browser exposes without `Access-Control-Expose-Headers`.
pub const SIMPLE_RESPONSE_HEADERS: [&str; 5] =
    ["Cache-Control", "Content-Language", "Expires", "Last-Modified", "Pragma"];

/// Context key holding the request's [`CorsMode`].
pub const CONTEXT_MODE: &str = "cors";

/// Context key holding the negotiated [`CorsHeaders`].
pub const CONTEXT_HEADERS: &str = "cors.headers";

// ── CorsCapable ───────────────────────────────────────────────────────────────

/// A participant's CORS declaration. Every method defaults to "nothing".
pub trait CorsCapable: Send + Sync {
    fn allowed_origins(&self, _route: &Route) -> Vec<String> {
        Vec::new()
    }

    fn allowed_headers(&self, _route: &Route) -> Vec<String> {
        Vec::new()
    }

    fn allowed_methods(&self, _route: &Route) -> Vec<String> {
        Vec::new()
    }

    fn exposed_headers(&self, _route: &Route) -> Vec<String> {
        Vec::new()
    }

    /// The endpoint supports credentialed requests.
    fn uses_credentials(&self, _route: &Route) -> bool {
        false
    }

    /// The request at hand carries credentials.
    fn has_credentials(&self, _route: &Route) -> bool {
        false
    }

    /// Seconds a preflight result may be cached.
    fn max_age(&self, _route: &Route) -> Option<u32> {
        None
    }
}

/// What the [`Cors`] middleware decided about the current request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CorsMode {
    /// A simple cross-origin request; the pipeline runs as usual.
    Request,
    /// An accepted preflight request.
    Preflight,
}

/// Response headers negotiated during the request phase, sorted by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CorsHeaders(Vec<(String, String)>);

impl CorsHeaders {
    pub(crate) fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.binary_search_by(|(k, _)| k.as_str().cmp(name)) {
            Ok(i) => self.0[i].1 = value,
            Err(i) => self.0.insert(i, (name.to_owned(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// One merged policy dimension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Allowed {
    Any,
    Only(Vec<String>),
}

impl Allowed {
    fn merge(declared: impl Iterator<Item = Vec<String>>, normalize: fn(&str) -> String) -> Self {
        let mut values: Vec<String> = Vec::new();
        for list in declared {
            for value in list {
                let value = value.trim();
                if value == WILDCARD {
                    return Self::Any;
                }
                let value = normalize(value);
                if !value.is_empty() && !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        Self::Only(values)
    }

    pub(crate) fn allows(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(values) => values.iter().any(|v| v == value),
        }
    }
}

/// Every participant's declaration folded together for one route.
#[derive(Debug)]
pub(crate) struct Aggregate {
    pub(crate) origins: Allowed,
    pub(crate) methods: Allowed,
    pub(crate) headers: Allowed,
    pub(crate) exposed: Allowed,
    pub(crate) credentials: bool,
    pub(crate) max_age: Option<u32>,
}

impl Aggregate {
    pub(crate) fn collect<'a>(declarations: impl Iterator<Item = &'a dyn CorsCapable>, route: &Route) -> Self {
        let declarations: Vec<&dyn CorsCapable> = declarations.collect();
        let merge = |dimension: fn(&dyn CorsCapable, &Route) -> Vec<String>, normalize: fn(&str) -> String| {
            Allowed::merge(declarations.iter().map(|d| dimension(*d, route)), normalize)
        };

        Self {
            origins: merge(|d, r| d.allowed_origins(r), normalize_origin),
            methods: merge(|d, r| d.allowed_methods(r), normalize_method),
            headers: merge(|d, r| d.allowed_headers(r), normalize_name),
            exposed: merge(|d, r| d.exposed_headers(r), normalize_name),
            credentials: declarations
                .iter()
                .any(|d| d.uses_credentials(route) || d.has_credentials(route)),
            // the most conservative cache lifetime wins
            max_age: declarations.iter().filter_map(|d| d.max_age(route)).min(),
        }
    }
}

fn normalize_method(method: &str) -> String {
    method.to_ascii_uppercase()
}

/// Scheme and host of an origin compare case-insensitively.
pub(crate) fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

// ── CorsPolicy ────────────────────────────────────────────────────────────────

/// A static CORS declaration, usually loaded from the `[cors]` table of the
/// configuration file.
///
/// ```toml
/// [cors]
/// allowed_origins = ["https://app.example.com"]
/// allowed_methods = ["GET", "PUT"]
/// allowed_headers = ["X-Api-Key"]
/// exposed_headers = ["X-Request-Id"]
/// credentials = true
/// max_age = 600
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
    pub max_age: Option<u32>,
}

impl CorsPolicy {
    /// Wildcard in every dimension, no credentials.
    pub fn permissive() -> Self {
        Self {
            allowed_origins: vec![WILDCARD.to_owned()],
            allowed_headers: vec![WILDCARD.to_owned()],
            allowed_methods: vec![WILDCARD.to_owned()],
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: None,
        }
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_methods.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_headers.extend(headers.into_iter().map(Into::into));
        self
    }

    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exposed_headers.extend(headers.into_iter().map(Into::into));
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.credentials = allow;
        self
    }

    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }
}

impl CorsCapable for CorsPolicy {
    fn allowed_origins(&self, _route: &Route) -> Vec<String> { self.allowed_origins.clone() }
    fn allowed_headers(&self, _route: &Route) -> Vec<String> { self.allowed_headers.clone() }
    fn allowed_methods(&self, _route: &Route) -> Vec<String> { self.allowed_methods.clone() }
    fn exposed_headers(&self, _route: &Route) -> Vec<String> { self.exposed_headers.clone() }
    fn uses_credentials(&self, _route: &Route) -> bool { self.credentials }
    fn max_age(&self, _route: &Route) -> Option<u32> { self.max_age }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::request::Request;

    fn route() -> Route {
        Route::new("test", Request::default(), Context::new())
    }

    #[test]
    fn wildcard_in_any_declaration_wins() {
        let narrow = CorsPolicy::default().allow_origin("https://a.test").allow_methods(["put"]);
        let wide = CorsPolicy::default().allow_methods(["*"]);
        let declarations: [&dyn CorsCapable; 2] = [&narrow, &wide];

        let cors = Aggregate::collect(declarations.into_iter(), &route());
        assert_eq!(cors.methods, Allowed::Any);
        assert_eq!(cors.origins, Allowed::Only(vec!["https://a.test".into()]));
        assert!(!cors.credentials);
    }

    #[test]
    fn dimensions_are_normalized_and_deduplicated() {
        let a = CorsPolicy::default().allow_headers(["x-api-key", "content-type"]).allow_methods(["get"]);
        let b = CorsPolicy::default()
            .allow_headers(["X-API-KEY"])
            .allow_methods(["GET", "delete"])
            .allow_origin("HTTPS://A.test/")
            .allow_credentials(true)
            .max_age(60);
        let c = CorsPolicy::default().max_age(30);
        let declarations: [&dyn CorsCapable; 3] = [&a, &b, &c];

        let cors = Aggregate::collect(declarations.into_iter(), &route());
        assert_eq!(cors.headers, Allowed::Only(vec!["X-Api-Key".into(), "Content-Type".into()]));
        assert_eq!(cors.methods, Allowed::Only(vec!["GET".into(), "DELETE".into()]));
        assert!(cors.origins.allows("https://a.test"));
        assert!(cors.credentials);
        assert_eq!(cors.max_age, Some(30));
    }

    #[test]
    fn no_declarations_allow_nothing() {
        let cors = Aggregate::collect(std::iter::empty(), &route());
        assert!(!cors.origins.allows("https://a.test"));
        assert_eq!(cors.max_age, None);
    }

    #[test]
    fn headers_stay_sorted() {
        let mut headers = CorsHeaders::default();
        headers.set("Vary", "Origin");
        headers.set("Access-Control-Allow-Origin", "*");
        headers.set("Vary", "Origin");
        let names: Vec<_> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["Access-Control-Allow-Origin", "Vary"]);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: CorsPolicy = toml::from_str("allowed_origins = [\"*\"]\nmax_age = 10").unwrap();
        assert_eq!(policy.allowed_origins, ["*"]);
        assert!(policy.allowed_methods.is_empty());
        assert_eq!(policy.max_age, Some(10));
    }
}
