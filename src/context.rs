//! Per-request side-channel state.
//!
//! A [`Context`] is created once per inbound request by a
//! [`ContextFactory`], travels with the [`Route`](crate::Route) through the
//! whole pipeline and is dropped with it. Any participant may read or write
//! it; CORS negotiation uses it to carry headers from the request phase to
//! the response phase.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::request::Request;

/// String-keyed bag of arbitrary values.
///
/// ```rust
/// use stanza::Context;
///
/// let mut context = Context::new();
/// context.set("tenant", 42_u32);
/// assert_eq!(context.get::<u32>("tenant"), Some(&42));
/// assert_eq!(context.get::<String>("tenant"), None);
/// ```
#[derive(Default)]
pub struct Context {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value under `key`, if there is one of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut()
    }

    /// Stores `value` under `key`, replacing whatever was there.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

// ── ContextFactory ────────────────────────────────────────────────────────────

/// Creates the [`Context`] for each inbound request.
///
/// Implemented for any `Fn(&Request) -> Context`, so a closure is enough:
///
/// ```rust
/// use stanza::{Context, Message, Request, Router};
///
/// let router = Router::new().context_factory(|request: &Request| {
///     let mut context = Context::new();
///     context.set("request_id", request.header_line("X-Request-Id"));
///     context
/// });
/// ```
pub trait ContextFactory: Send + Sync + 'static {
    fn context(&self, request: &Request) -> Context;
}

impl<F> ContextFactory for F
where
    F: Fn(&Request) -> Context + Send + Sync + 'static,
{
    fn context(&self, request: &Request) -> Context {
        self(request)
    }
}

/// Hands out empty contexts.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultContextFactory;

impl ContextFactory for DefaultContextFactory {
    fn context(&self, _request: &Request) -> Context {
        Context::new()
    }
}
