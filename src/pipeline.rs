//! Collaborator contracts for the body, processing and rendering stages.
//!
//! Each stage holds an ordered list of collaborators; the first whose
//! `applies` returns `true` does the work. Any collaborator may also opt into
//! CORS negotiation by returning a [`CorsCapable`] from `cors()`.

use std::sync::Arc;

use crate::cors::CorsCapable;
use crate::error::Failure;
use crate::message::Message;
use crate::middleware::Middleware;
use crate::outcome::{Outcome, Payload};
use crate::response::Response;
use crate::route::Route;

/// Turns the request body into a [`Payload`].
pub trait Requester: Send + Sync {
    fn applies(&self, _route: &Route) -> bool {
        true
    }

    /// Rejecting the input should fail with [`Failure::InvalidBody`].
    fn body(&self, route: &mut Route) -> Result<Payload, Failure>;

    fn cors(&self) -> Option<&dyn CorsCapable> {
        None
    }
}

/// Runs the domain logic.
///
/// Deferred, forbidden and unavailable results are reported either as an
/// `Ok` outcome ([`Outcome::delayed`], …) or as the matching [`Failure`];
/// the controller treats both the same way.
pub trait Processor: Send + Sync {
    fn applies(&self, _route: &Route, _body: &Payload) -> bool {
        true
    }

    fn outcome(&self, route: &mut Route, body: &Payload) -> Result<Outcome, Failure>;

    fn cors(&self) -> Option<&dyn CorsCapable> {
        None
    }
}

/// Renders an [`Outcome`] into a [`Response`].
///
/// By default a responder only sees successful outcomes; failures fall
/// through to the controller's plain-text rendering. Override `applies` to
/// render failures yourself.
pub trait Responder: Send + Sync {
    fn applies(&self, _route: &Route, outcome: &Outcome) -> bool {
        outcome.is_success()
    }

    fn response(&self, route: &mut Route, outcome: &Outcome) -> Result<Response, Failure>;

    fn cors(&self) -> Option<&dyn CorsCapable> {
        None
    }
}

// ── Stock requesters ──────────────────────────────────────────────────────────

/// Ignores the body. For routes that take their input from the path or the
/// query string.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyBody;

impl Requester for EmptyBody {
    fn body(&self, _route: &mut Route) -> Result<Payload, Failure> {
        Ok(Payload::Empty)
    }
}

/// The body as [`Payload::Text`] when it is UTF-8, else [`Payload::Bytes`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RawBody;

impl Requester for RawBody {
    fn body(&self, route: &mut Route) -> Result<Payload, Failure> {
        let bytes = route.request().body().bytes();
        if bytes.is_empty() {
            return Ok(Payload::Empty);
        }
        Ok(match std::str::from_utf8(&bytes) {
            Ok(text) => Payload::Text(text.to_owned()),
            Err(_) => Payload::Bytes(bytes),
        })
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Read-only view of every participant handling the current request.
///
/// Passed to middleware so cross-cutting layers (CORS in particular) can
/// inspect the rest of the pipeline.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    pub(crate) requesters: &'a [Arc<dyn Requester>],
    pub(crate) processors: &'a [Arc<dyn Processor>],
    pub(crate) responders: &'a [Arc<dyn Responder>],
    pub(crate) middleware: &'a [Arc<dyn Middleware>],
}

impl<'a> Pipeline<'a> {
    pub fn requesters(&self) -> &'a [Arc<dyn Requester>] { self.requesters }
    pub fn processors(&self) -> &'a [Arc<dyn Processor>] { self.processors }
    pub fn responders(&self) -> &'a [Arc<dyn Responder>] { self.responders }
    pub fn middleware(&self) -> &'a [Arc<dyn Middleware>] { self.middleware }

    /// Every CORS declaration: requesters, processors, responders, then
    /// middleware.
    pub fn cors(&self) -> impl Iterator<Item = &'a dyn CorsCapable> + 'a {
        let requesters = self.requesters.iter().filter_map(|r| r.cors());
        let processors = self.processors.iter().filter_map(|p| p.cors());
        let responders = self.responders.iter().filter_map(|r| r.cors());
        let middleware = self.middleware.iter().filter_map(|m| m.cors());
        requesters.chain(processors).chain(responders).chain(middleware)
    }
}
