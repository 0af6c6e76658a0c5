//! The request pipeline.
//!
//! A [`Controller`] turns one [`Route`] into one [`Response`]:
//!
//! ```text
//! authenticate ─► middleware (in) ─► authorize ─► requester ─► processor
//!                                                                  │
//!          response ◄─ middleware (out) ◄─ responder ◄── outcome ◄─┘
//! ```
//!
//! A [`Failure`] anywhere before rendering becomes an [`Outcome`] and is
//! rendered like any other. A failure while rendering or in the outbound
//! middleware becomes a bare [`Response::failure`]. [`Controller::handle`]
//! never fails.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, debug_span, warn};

use crate::auth::{Authentication, Authentications, Authorization};
use crate::cors::{Cors, Preflight};
use crate::error::Failure;
use crate::middleware::{Middleware, MiddlewareFactory, Stack};
use crate::outcome::Outcome;
use crate::pipeline::{Pipeline, Processor, Requester, Responder};
use crate::response::Response;
use crate::route::Route;

/// An immutable, shareable pipeline definition.
///
/// Build one with [`Controller::builder`]. Nothing in `handle` writes to the
/// controller, so a single instance serves concurrent requests.
///
/// ```rust
/// use stanza::{
///     Context, Controller, Failure, Message, Outcome, Payload, Processor, Request, Requester,
///     Responder, Response, Route,
/// };
///
/// struct Raw;
/// impl Requester for Raw {
///     fn body(&self, route: &mut Route) -> Result<Payload, Failure> {
///         Ok(Payload::Text(route.request().body().to_string()))
///     }
/// }
///
/// struct Echo;
/// impl Processor for Echo {
///     fn outcome(&self, _route: &mut Route, body: &Payload) -> Result<Outcome, Failure> {
///         Ok(Outcome::complete(body.clone()))
///     }
/// }
///
/// struct Text;
/// impl Responder for Text {
///     fn response(&self, _route: &mut Route, outcome: &Outcome) -> Result<Response, Failure> {
///         Ok(Response::text(outcome.payload().as_text().unwrap_or_default()))
///     }
/// }
///
/// let controller = Controller::builder().requester(Raw).processor(Echo).responder(Text).build();
///
/// let request = Request::parse("POST", "/echo").unwrap().with_body("ping");
/// let mut route = Route::new("echo", request, Context::new());
/// assert_eq!(controller.handle(&mut route).body().to_string(), "ping");
/// ```
#[derive(Clone, Default)]
pub struct Controller {
    authentication: Authentications,
    authorization: Option<Arc<dyn Authorization>>,
    requesters: Vec<Arc<dyn Requester>>,
    processors: Vec<Arc<dyn Processor>>,
    responders: Vec<Arc<dyn Responder>>,
    middleware: Vec<Arc<dyn Middleware>>,
    middleware_factory: Option<Arc<dyn MiddlewareFactory>>,
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    /// Runs `route` through the pipeline. Always produces a response.
    pub fn handle(&self, route: &mut Route) -> Response {
        let span = debug_span!("handle", route = %route.name(), request = %route.request());
        let _guard = span.enter();

        // Grouping is per call; the controller itself stays read-only.
        let mut middleware = self.middleware.clone();
        if let Some(factory) = &self.middleware_factory {
            middleware.extend(factory.middleware(route));
        }
        let stack = Stack::new(middleware);
        let pipeline = Pipeline {
            requesters: &self.requesters,
            processors: &self.processors,
            responders: &self.responders,
            middleware: stack.all(),
        };

        let outcome = self.run(route, &stack, &pipeline).unwrap_or_else(|failure| {
            warn!(status = failure.status(), %failure, "request failed");
            Outcome::from(failure)
        });
        debug!(status = outcome.status(), "outcome");

        self.respond(route, &outcome, &stack, &pipeline).unwrap_or_else(|failure| {
            warn!(status = failure.status(), %failure, "response failed");
            Response::failure(failure.status(), &failure.to_string())
        })
    }

    fn run(&self, route: &mut Route, stack: &Stack, pipeline: &Pipeline<'_>) -> Result<Outcome, Failure> {
        if self.authentication.applies(route) {
            let identity = self.authentication.authenticate(route);
            debug!(identity = identity.as_ref().map(|i| i.id()), "authenticated");
            route.set_identity(identity);
        }

        for middleware in stack.request_order() {
            middleware.on_request(route, pipeline)?;
        }

        if let Some(authorization) = &self.authorization {
            if !authorization.authorize(route) {
                return Err(Failure::AccessDenied("Access denied.".to_owned()));
            }
        }

        let requester = self
            .requesters
            .iter()
            .find(|r| r.applies(route))
            .ok_or(Failure::NoRequester)?;
        let body = requester.body(route)?;

        let processor = self
            .processors
            .iter()
            .find(|p| p.applies(route, &body))
            .ok_or(Failure::NoProcessor)?;
        processor.outcome(route, &body)
    }

    fn respond(
        &self,
        route: &mut Route,
        outcome: &Outcome,
        stack: &Stack,
        pipeline: &Pipeline<'_>,
    ) -> Result<Response, Failure> {
        let mut response = match self.responders.iter().find(|r| r.applies(route, outcome)) {
            Some(responder) => responder.response(route, outcome)?,
            None if outcome.status() == Outcome::COMPLETE => return Err(Failure::NoResponder),
            None => render_default(outcome),
        };

        for middleware in stack.response_order() {
            response = middleware.on_response(route, response, pipeline)?;
        }
        Ok(response)
    }
}

/// Rendering for outcomes no responder claims: the status, with the payload
/// as a plain-text body.
fn render_default(outcome: &Outcome) -> Response {
    if outcome.status() == Outcome::DELAYED {
        return Response::from_status(StatusCode::NO_CONTENT);
    }
    let message = outcome.payload().to_bytes();
    Response::failure(outcome.status(), &String::from_utf8_lossy(&message))
}

// ── ControllerBuilder ─────────────────────────────────────────────────────────

/// Collects the participants of a [`Controller`].
///
/// Requesters, processors and responders are tried in the order they are
/// added.
#[derive(Default)]
pub struct ControllerBuilder {
    controller: Controller,
    preflight: bool,
}

impl ControllerBuilder {
    /// Adds an authentication scheme. The first one that applies decides.
    pub fn authentication(mut self, authentication: impl Authentication + 'static) -> Self {
        self.controller.authentication = self.controller.authentication.with(authentication);
        self
    }

    pub fn authorization(mut self, authorization: impl Authorization + 'static) -> Self {
        self.controller.authorization = Some(Arc::new(authorization));
        self
    }

    pub fn requester(mut self, requester: impl Requester + 'static) -> Self {
        self.controller.requesters.push(Arc::new(requester));
        self
    }

    pub fn processor(mut self, processor: impl Processor + 'static) -> Self {
        self.controller.processors.push(Arc::new(processor));
        self
    }

    pub fn responder(mut self, responder: impl Responder + 'static) -> Self {
        self.controller.responders.push(Arc::new(responder));
        self
    }

    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.controller.middleware.push(Arc::new(middleware));
        self
    }

    /// Per-route middleware, appended after the statically registered ones.
    pub fn middleware_factory(mut self, factory: impl MiddlewareFactory + 'static) -> Self {
        self.controller.middleware_factory = Some(Arc::new(factory));
        self
    }

    /// Registers `cors` as middleware and [`Preflight`] at the front of the
    /// requester, processor and responder chains.
    pub fn cors(mut self, cors: Cors) -> Self {
        self.controller.middleware.push(Arc::new(cors));
        if !self.preflight {
            self.preflight = true;
            self.controller.requesters.insert(0, Arc::new(Preflight));
            self.controller.processors.insert(0, Arc::new(Preflight));
            self.controller.responders.insert(0, Arc::new(Preflight));
        }
        self
    }

    pub fn build(self) -> Controller {
        self.controller
    }
}
