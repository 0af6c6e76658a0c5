//! A request matched to a controller, with everything the pipeline needs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;

/// Who made the request, as established by an
/// [`Authentication`](crate::Authentication).
///
/// Account storage is the application's business; the pipeline only needs
/// something it can pass around and name in logs.
pub trait Identity: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;
}

/// The resolved match of an inbound request.
///
/// Owns the request, its [`Context`] and, once authenticated, an
/// [`Identity`]. The [`Controller`](crate::Controller) threads one `Route`
/// through every pipeline stage; middleware may swap its request.
#[derive(Debug)]
pub struct Route {
    name: String,
    arguments: HashMap<String, String>,
    request: Request,
    context: Context,
    identity: Option<Arc<dyn Identity>>,
}

impl Route {
    pub fn new(name: impl Into<String>, request: Request, context: Context) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            request,
            context,
            identity: None,
        }
    }

    /// Attaches the path arguments captured by the router.
    pub fn with_arguments(mut self, arguments: HashMap<String, String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn arguments(&self) -> &HashMap<String, String> { &self.arguments }

    /// For a route `/users/{id}`, `route.argument("id")` on `/users/42`
    /// returns `Some("42")`.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }

    pub fn request(&self) -> &Request { &self.request }

    pub fn set_request(&mut self, request: Request) {
        self.request = request;
    }

    pub fn context(&self) -> &Context { &self.context }
    pub fn context_mut(&mut self) -> &mut Context { &mut self.context }

    /// The request and a mutable context at the same time.
    pub fn split_mut(&mut self) -> (&Request, &mut Context) {
        (&self.request, &mut self.context)
    }

    pub fn identity(&self) -> Option<&Arc<dyn Identity>> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Option<Arc<dyn Identity>>) {
        self.identity = identity;
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn into_parts(self) -> (Request, Context) {
        (self.request, self.context)
    }
}
