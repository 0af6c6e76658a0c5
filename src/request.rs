//! Inbound HTTP request value.

use std::fmt;
use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::environment::Environment;
use crate::error::Error;
use crate::message::{Head, Message, private};
use crate::method::Method;
use crate::uri::{QueryValue, Uri};

/// An immutable HTTP request.
///
/// ```rust
/// use stanza::{Message, Method, Request};
///
/// let request = Request::parse("post", "https://api.example.com/users?page=2").unwrap();
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.header_line("Host"), "api.example.com");
/// assert_eq!(request.request_target(), "/users?page=2");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    head: Head,
    method: Method,
    target: Option<String>,
    uri: Uri,
    server: Arc<Environment>,
}

impl Request {
    /// A request with an empty body. The `Host` header is taken from `uri`
    /// when it has a host.
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut request = Self { head: Head::default(), method, target: None, uri, server: Arc::default() };
        request.sync_host();
        request
    }

    /// Like [`new`](Self::new), validating both method and URI.
    pub fn parse(method: &str, uri: &str) -> Result<Self, Error> {
        Ok(Self::new(method.parse()?, Uri::parse(uri)?))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Case-insensitive; fails with [`Error::InvalidMethod`] outside the
    /// supported whitelist.
    pub fn with_method(&self, method: &str) -> Result<Self, Error> {
        let mut next = self.clone();
        next.method = method.parse()?;
        Ok(next)
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replaces the URI. The `Host` header follows the new URI's host unless
    /// `preserve_host` is set and a `Host` header already exists.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut next = self.clone();
        next.uri = uri;
        if !(preserve_host && next.has_header("Host")) {
            next.sync_host();
        }
        next
    }

    /// The explicit request target if one was set, otherwise the origin form
    /// (`path?query`) of the URI.
    pub fn request_target(&self) -> String {
        match &self.target {
            Some(target) => target.clone(),
            None => self.uri.origin_form(),
        }
    }

    /// Sets an explicit request target: `*`, or a URI reference already in
    /// canonical form. An empty target clears it.
    pub fn with_request_target(&self, target: &str) -> Result<Self, Error> {
        let mut next = self.clone();
        next.target = match target {
            "" => None,
            "*" => Some(target.to_owned()),
            _ => match Uri::parse(target) {
                Ok(uri) if uri.to_string() == target => Some(target.to_owned()),
                _ => return Err(Error::InvalidRequestTarget(target.to_owned())),
            },
        };
        Ok(next)
    }

    /// The decoded query of the URI.
    pub fn query_params(&self) -> &[(String, QueryValue)] {
        self.uri.query_values()
    }

    /// Looks up a single decoded query parameter. A bare `?flag` yields
    /// `Some(None)`.
    pub fn query_param(&self, key: &str) -> Option<Option<&str>> {
        self.uri.query_value(key).map(QueryValue::as_str)
    }

    /// Replaces the query. The `Host` header is left alone.
    pub fn with_query_params<I, K>(&self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, QueryValue)>,
        K: Into<String>,
    {
        let mut next = self.clone();
        next.uri = self.uri.with_query_values(params);
        next
    }

    /// Cookies from every `Cookie` header line, values percent-decoded.
    /// A repeated name keeps its first value.
    pub fn cookie_params(&self) -> Vec<(String, String)> {
        let mut cookies: Vec<(String, String)> = Vec::new();
        let pairs = self
            .header("Cookie")
            .iter()
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')));
        for (name, value) in pairs {
            if name.is_empty() || cookies.iter().any(|(n, _)| n == name) {
                continue;
            }
            cookies.push((name.to_owned(), percent_decode_str(value).decode_utf8_lossy().into_owned()));
        }
        cookies
    }

    pub fn cookie_param(&self, name: &str) -> Option<String> {
        self.cookie_params().into_iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The server variables this request was built from. Empty unless it
    /// came from [`Request::from_environment`].
    pub fn server_params(&self) -> &Environment {
        &self.server
    }

    pub(crate) fn with_server_params(mut self, env: Environment) -> Self {
        self.server = Arc::new(env);
        self
    }

    fn sync_host(&mut self) {
        let host = self.uri.host();
        if host.is_empty() {
            return;
        }
        let value = match self.uri.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        // A validated host is always a valid field value.
        self.head.headers.replace("Host", vec![value]);
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::Get, Uri::default())
    }
}

impl private::Sealed for Request {
    fn head(&self) -> &Head { &self.head }
    fn head_mut(&mut self) -> &mut Head { &mut self.head }
}

impl Message for Request {}

/// The request line, e.g. `GET /users?page=2 HTTP/1.1`.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/{}", self.method, self.request_target(), self.head.version)
    }
}
