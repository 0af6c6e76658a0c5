//! Middleware layer.
//!
//! Middleware wraps the body/process/render stages and is the right place
//! for cross-cutting concerns: CORS, request ids, response headers.
//!
//! # Ordering
//!
//! Middleware is grouped by [`Middleware::priority`]. On the way in, groups
//! run from highest to lowest priority, members in registration order. On
//! the way out the whole thing mirrors: lowest to highest, members in
//! reverse. Registering `a(-1), b(0), c(0), d(1)` gives
//!
//! ```text
//! request:  d  b  c  a
//! response: a  c  b  d
//! ```
//!
//! Built-in middleware:
//! - [`Cors`](crate::Cors): CORS negotiation, priority 1000

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cors::CorsCapable;
use crate::error::Failure;
use crate::pipeline::Pipeline;
use crate::response::Response;
use crate::route::Route;

/// A dual-phase pipeline participant.
///
/// Both hooks default to pass-through, so an implementation only overrides
/// the phase it cares about.
pub trait Middleware: Send + Sync {
    fn priority(&self) -> i32 {
        0
    }

    /// May replace the route's request via [`Route::set_request`] or stash
    /// state in its context. Failing skips straight to rendering.
    fn on_request(&self, _route: &mut Route, _pipeline: &Pipeline<'_>) -> Result<(), Failure> {
        Ok(())
    }

    /// May replace or augment the outbound response.
    fn on_response(
        &self,
        _route: &mut Route,
        response: Response,
        _pipeline: &Pipeline<'_>,
    ) -> Result<Response, Failure> {
        Ok(response)
    }

    fn cors(&self) -> Option<&dyn CorsCapable> {
        None
    }
}

/// Supplies extra middleware per route, on top of what the controller
/// registers statically.
pub trait MiddlewareFactory: Send + Sync {
    fn middleware(&self, route: &Route) -> Vec<Arc<dyn Middleware>>;
}

impl<F> MiddlewareFactory for F
where
    F: Fn(&Route) -> Vec<Arc<dyn Middleware>> + Send + Sync,
{
    fn middleware(&self, route: &Route) -> Vec<Arc<dyn Middleware>> {
        self(route)
    }
}

// ── Stack ─────────────────────────────────────────────────────────────────────

/// Priority grouping for one `handle` call. Built fresh each time and never
/// stored on the controller.
pub(crate) struct Stack {
    all: Vec<Arc<dyn Middleware>>,
    groups: BTreeMap<i32, Vec<Arc<dyn Middleware>>>,
}

impl Stack {
    pub(crate) fn new(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        let mut groups: BTreeMap<i32, Vec<Arc<dyn Middleware>>> = BTreeMap::new();
        for m in &middleware {
            groups.entry(m.priority()).or_default().push(Arc::clone(m));
        }
        Self { all: middleware, groups }
    }

    /// Everything, in registration order.
    pub(crate) fn all(&self) -> &[Arc<dyn Middleware>] {
        &self.all
    }

    /// Highest priority first, registration order within a group.
    pub(crate) fn request_order(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.groups.values().rev().flat_map(|group| group.iter())
    }

    /// Lowest priority first, reverse registration order within a group.
    pub(crate) fn response_order(&self) -> impl Iterator<Item = &Arc<dyn Middleware>> {
        self.groups.values().flat_map(|group| group.iter().rev())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Prioritized(i32);

    impl Middleware for Prioritized {
        fn priority(&self) -> i32 { self.0 }
    }

    fn positions<'a>(order: impl Iterator<Item = &'a Arc<dyn Middleware>>, all: &[Arc<dyn Middleware>]) -> Vec<usize> {
        order.map(|m| all.iter().position(|x| Arc::ptr_eq(x, m)).unwrap()).collect()
    }

    #[test]
    fn groups_mirror_between_phases() {
        let registered: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Prioritized(-1)),
            Arc::new(Prioritized(0)),
            Arc::new(Prioritized(0)),
            Arc::new(Prioritized(1)),
        ];
        let stack = Stack::new(registered.clone());

        // indices into `registered`: a=0 b=1 c=2 d=3
        assert_eq!(positions(stack.request_order(), &registered), [3, 1, 2, 0]);
        assert_eq!(positions(stack.response_order(), &registered), [0, 2, 1, 3]);
        assert_eq!(stack.all().len(), 4);
    }

    #[test]
    fn empty_stack_visits_nothing() {
        let stack = Stack::new(Vec::new());
        assert_eq!(stack.request_order().count(), 0);
        assert_eq!(stack.response_order().count(), 0);
    }
}
