//! Building a [`Request`] from CGI-style server variables.
//!
//! The variables are passed in explicitly; nothing here reads process
//! state unless [`Environment::from_process`] is called.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::headers::normalize_name;
use crate::message::Message;
use crate::method::Method;
use crate::request::Request;
use crate::stream::Stream;
use crate::uri::Uri;

/// A snapshot of server variables (`REQUEST_METHOD`, `HTTP_HOST`, …).
///
/// ```rust
/// use stanza::{Environment, Message, Request};
///
/// let env: Environment = [
///     ("REQUEST_METHOD", "POST"),
///     ("REQUEST_URI", "/submit?draft"),
///     ("HTTP_HOST", "example.com"),
///     ("HTTP_X_REQUEST_ID", "abc"),
///     ("SERVER_PROTOCOL", "HTTP/1.0"),
/// ]
/// .into_iter()
/// .collect();
///
/// let request = Request::from_environment(&env, "payload").unwrap();
/// assert_eq!(request.uri().to_string(), "http://example.com/submit?draft");
/// assert_eq!(request.header_line("X-Request-Id"), "abc");
/// assert_eq!(request.protocol_version(), "1.0");
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn scheme(&self) -> &'static str {
        match self.get("HTTPS") {
            Some(https) if !https.eq_ignore_ascii_case("off") => "https",
            _ => "http",
        }
    }

    /// `REQUEST_URI`, or `SCRIPT_NAME` plus `QUERY_STRING`.
    fn target(&self) -> String {
        if let Some(uri) = self.get("REQUEST_URI") {
            return uri.to_owned();
        }
        let script = self.get("SCRIPT_NAME").unwrap_or("/");
        let mut target = if script.starts_with('/') { script.to_owned() } else { format!("/{script}") };
        if let Some(query) = self.get("QUERY_STRING") {
            target.push('?');
            target.push_str(query);
        }
        target
    }

    /// `HTTP_*` variables plus `CONTENT_TYPE` and `CONTENT_LENGTH`, with
    /// title-cased names.
    fn headers(&self) -> impl Iterator<Item = (String, &str)> {
        self.iter().filter(|(_, value)| !value.is_empty()).filter_map(|(key, value)| {
            let name = match key {
                "CONTENT_TYPE" | "CONTENT_LENGTH" => key,
                _ => key.strip_prefix("HTTP_")?,
            };
            Some((normalize_name(&name.replace('_', "-")), value))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl Request {
    /// Builds a request from server variables and the raw body.
    ///
    /// | Variable | Used for |
    /// |---|---|
    /// | `REQUEST_METHOD` | method, default `GET` |
    /// | `REQUEST_URI`, else `SCRIPT_NAME` + `QUERY_STRING` | path and query |
    /// | `HTTP_HOST`, else `SERVER_NAME`, else `localhost` | host |
    /// | `HTTPS` (anything but `off`) | `https` scheme |
    /// | `SERVER_PROTOCOL` (`HTTP/x.y`) | protocol version |
    /// | `HTTP_*`, `CONTENT_TYPE`, `CONTENT_LENGTH` | headers |
    ///
    /// The whole snapshot stays available as
    /// [`server_params`](Request::server_params), and `HTTP_COOKIE` feeds
    /// [`cookie_params`](Request::cookie_params).
    pub fn from_environment(env: &Environment, body: impl Into<Stream>) -> Result<Self, Error> {
        let method = match env.get("REQUEST_METHOD") {
            Some(method) => method.parse()?,
            None => Method::Get,
        };
        let host = env.get("HTTP_HOST").or_else(|| env.get("SERVER_NAME")).unwrap_or("localhost");
        let uri = Uri::parse(&format!("{}://{host}{}", env.scheme(), env.target()))?;

        let mut request = Request::new(method, uri).with_body(body);
        if let Some(version) = env.get("SERVER_PROTOCOL").and_then(|p| p.strip_prefix("HTTP/")) {
            request = request.with_protocol_version(version)?;
        }
        for (name, value) in env.headers() {
            request = request.with_header(&name, value)?;
        }
        Ok(request.with_server_params(env.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_script_name_and_server_name() {
        let env: Environment = [
            ("SCRIPT_NAME", "index.php"),
            ("QUERY_STRING", "a=1&b"),
            ("SERVER_NAME", "internal.test"),
            ("HTTPS", "on"),
        ]
        .into_iter()
        .collect();

        let request = Request::from_environment(&env, "").unwrap();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.uri().to_string(), "https://internal.test/index.php?a=1&b");
        assert_eq!(request.header_line("Host"), "internal.test");
        assert_eq!(request.protocol_version(), "1.1");
    }

    #[test]
    fn defaults_to_localhost_over_http() {
        let env: Environment = [("HTTPS", "off"), ("CONTENT_TYPE", "text/plain")].into_iter().collect();
        let request = Request::from_environment(&env, "body").unwrap();
        assert_eq!(request.uri().to_string(), "http://localhost/");
        assert_eq!(request.header_line("Content-Type"), "text/plain");
        assert_eq!(request.body().to_string(), "body");
    }

    #[test]
    fn rejects_invalid_variables() {
        let env: Environment = [("REQUEST_METHOD", "BREW")].into_iter().collect();
        assert!(matches!(Request::from_environment(&env, ""), Err(Error::InvalidMethod(_))));

        let env: Environment = [("SERVER_PROTOCOL", "HTTP/x")].into_iter().collect();
        assert!(matches!(Request::from_environment(&env, ""), Err(Error::InvalidProtocol(_))));

        let env: Environment = [("HTTP_X_BAD", "a\nb")].into_iter().collect();
        assert!(matches!(Request::from_environment(&env, ""), Err(Error::InvalidHeader { .. })));
    }

    #[test]
    fn keeps_server_params_and_cookies() {
        let env: Environment = [
            ("REQUEST_URI", "/"),
            ("HTTP_COOKIE", "id=42; flavour=oat"),
            ("HTTP_X_API_KEY", "k"),
            ("REMOTE_ADDR", "10.0.0.1"),
        ]
        .into_iter()
        .collect();

        let request = Request::from_environment(&env, "").unwrap();
        assert_eq!(request.server_params().get("REMOTE_ADDR"), Some("10.0.0.1"));
        assert_eq!(request.server_params().len(), 4);
        assert_eq!(request.cookie_param("flavour").as_deref(), Some("oat"));
        assert_eq!(request.header_line("X-Api-Key"), "k");
    }

    #[test]
    fn empty_variables_count_as_unset() {
        let mut env = Environment::new();
        env.set("HTTP_HOST", "");
        env.set("REQUEST_METHOD", "");
        let request = Request::from_environment(&env, "").unwrap();
        assert_eq!(request.uri().host(), "localhost");
        assert_eq!(request.method(), Method::Get);
    }
}
