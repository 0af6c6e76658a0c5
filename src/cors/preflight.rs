//! Answers accepted preflight requests without involving domain code.

use http::StatusCode;

use crate::cors::{CONTEXT_MODE, CorsMode};
use crate::error::Failure;
use crate::outcome::{Outcome, Payload};
use crate::pipeline::{Processor, Requester, Responder};
use crate::response::Response;
use crate::route::Route;

/// Requester, processor and responder for preflight requests the [`Cors`]
/// middleware has accepted: empty body, delayed outcome, `204 No Content`.
///
/// [`ControllerBuilder::cors`](crate::ControllerBuilder::cors) puts it in
/// front of every chain, so it only needs registering by hand when the
/// middleware is added through a factory.
///
/// [`Cors`]: crate::Cors
#[derive(Clone, Copy, Debug, Default)]
pub struct Preflight;

impl Preflight {
    fn accepted(route: &Route) -> bool {
        route.context().get::<CorsMode>(CONTEXT_MODE) == Some(&CorsMode::Preflight)
    }
}

impl Requester for Preflight {
    fn applies(&self, route: &Route) -> bool {
        Self::accepted(route)
    }

    fn body(&self, _route: &mut Route) -> Result<Payload, Failure> {
        Ok(Payload::Empty)
    }
}

impl Processor for Preflight {
    fn applies(&self, route: &Route, _body: &Payload) -> bool {
        Self::accepted(route)
    }

    fn outcome(&self, _route: &mut Route, _body: &Payload) -> Result<Outcome, Failure> {
        Ok(Outcome::delayed(Payload::Empty))
    }
}

impl Responder for Preflight {
    fn applies(&self, route: &Route, outcome: &Outcome) -> bool {
        Self::accepted(route) && outcome.is_success()
    }

    fn response(&self, _route: &mut Route, _outcome: &Outcome) -> Result<Response, Failure> {
        Ok(Response::from_status(StatusCode::NO_CONTENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::request::Request;

    #[test]
    fn only_applies_to_accepted_preflights() {
        let mut route = Route::new("test", Request::default(), Context::new());
        assert!(!Requester::applies(&Preflight, &route));

        route.context_mut().set(CONTEXT_MODE, CorsMode::Request);
        assert!(!Requester::applies(&Preflight, &route));

        route.context_mut().set(CONTEXT_MODE, CorsMode::Preflight);
        assert!(Requester::applies(&Preflight, &route));
        assert!(Processor::applies(&Preflight, &route, &Payload::Empty));
        assert!(!Responder::applies(&Preflight, &route, &Outcome::access("no")));

        let response = Responder::response(&Preflight, &mut route, &Outcome::delayed(Payload::Empty)).unwrap();
        assert_eq!(response.status(), 204);
    }
}
