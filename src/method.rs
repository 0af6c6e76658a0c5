//! HTTP request method as a typed enum.
//!
//! Only the eight methods a [`Request`](crate::Request) may carry are
//! representable. Parsing is case-insensitive (`"pAtch"` is `Patch`); the
//! wire form is always uppercase. Anything else is rejected with
//! [`Error::InvalidMethod`].

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A request method from the supported whitelist.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    #[default]
    Get,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Every supported method, in the order the whitelist lists them.
    pub const ALL: [Method; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Patch,
        Self::Delete,
        Self::Options,
        Self::Trace,
        Self::Connect,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or(Error::InvalidMethod(upper))
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = Error;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("PuT".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("pAtch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("options".parse::<Method>().unwrap().to_string(), "OPTIONS");
    }

    #[test]
    fn rejects_methods_outside_the_whitelist() {
        assert!(matches!("invalid".parse::<Method>(), Err(Error::InvalidMethod(m)) if m == "INVALID"));
        assert!("HEAD".parse::<Method>().is_err());
        assert!("".parse::<Method>().is_err());
    }

    #[test]
    fn converts_from_http_method() {
        assert_eq!(Method::try_from(&http::Method::DELETE).unwrap(), Method::Delete);
        assert!(Method::try_from(&http::Method::HEAD).is_err());
    }
}
