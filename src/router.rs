//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A match yields a named
//! [`Controller`] and a [`Route`] carrying the request, its fresh
//! [`Context`](crate::Context) and the captured path arguments.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::context::{ContextFactory, DefaultContextFactory};
use crate::controller::Controller;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

struct Endpoint {
    name: String,
    controller: Arc<Controller>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
    contexts: Arc<dyn ContextFactory>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), contexts: Arc::new(DefaultContextFactory) }
    }

    /// Register a controller for a method + path pair under `name`.
    ///
    /// Path parameters use `{name}` syntax; [`Route::argument`] retrieves
    /// them. Pass an `Arc<Controller>` to share one controller between
    /// several routes:
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use stanza::{Controller, Method, Router};
    /// let users = Arc::new(Controller::builder().build());
    /// Router::new()
    ///     .on(Method::Get,    "/users/{id}", "user.show",   Arc::clone(&users))
    ///     .on(Method::Delete, "/users/{id}", "user.delete", users);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern or conflicts with one
    /// already registered for `method`.
    pub fn on(mut self, method: Method, path: &str, name: &str, controller: impl Into<Arc<Controller>>) -> Self {
        let endpoint = Endpoint { name: name.to_owned(), controller: controller.into() };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, endpoint)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Creates each route's [`Context`](crate::Context). Defaults to an empty
    /// one.
    pub fn context_factory(mut self, factory: impl ContextFactory) -> Self {
        self.contexts = Arc::new(factory);
        self
    }

    /// Matches `request` by method and URI path.
    pub fn route(&self, request: Request) -> Option<(Arc<Controller>, Route)> {
        let tree = self.routes.get(&request.method())?;
        let matched = tree.at(request.uri().path()).ok()?;
        let arguments: HashMap<String, String> = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        let endpoint = matched.value;

        let context = self.contexts.context(&request);
        let route = Route::new(endpoint.name.as_str(), request, context).with_arguments(arguments);
        Some((Arc::clone(&endpoint.controller), route))
    }

    /// Routes and handles `request`; `404 Not Found` when nothing matches.
    pub fn handle(&self, request: Request) -> Response {
        let target = request.to_string();
        match self.route(request) {
            Some((controller, mut route)) => controller.handle(&mut route),
            None => {
                debug!(request = %target, "no route");
                Response::from_status(StatusCode::NOT_FOUND)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
