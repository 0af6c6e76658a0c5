//! Authentication and authorization contracts.
//!
//! Neither ships a scheme. An [`Authentication`] turns a route into an
//! optional [`Identity`]; an [`Authorization`] says yes or no once
//! middleware has run.

use std::sync::Arc;

use crate::route::{Identity, Route};

/// Establishes who is making the request.
///
/// Runs first in the pipeline and cannot fail: `None` simply means
/// anonymous.
pub trait Authentication: Send + Sync {
    /// Whether this scheme should look at the route at all.
    fn applies(&self, _route: &Route) -> bool {
        true
    }

    fn authenticate(&self, route: &Route) -> Option<Arc<dyn Identity>>;
}

/// Decides whether the (possibly anonymous) caller may proceed.
pub trait Authorization: Send + Sync {
    fn authorize(&self, route: &Route) -> bool;
}

/// An ordered list of authentication schemes. The first one that applies
/// decides.
///
/// ```rust
/// use std::sync::Arc;
/// use stanza::{Authentication, Authentications, Identity, Message, Route};
///
/// struct Bearer;
///
/// impl Authentication for Bearer {
///     fn applies(&self, route: &Route) -> bool {
///         route.request().header_line("Authorization").starts_with("Bearer ")
///     }
///
///     fn authenticate(&self, _route: &Route) -> Option<Arc<dyn Identity>> {
///         None
///     }
/// }
///
/// let chain = Authentications::new().with(Bearer);
/// ```
#[derive(Clone, Default)]
pub struct Authentications {
    schemes: Vec<Arc<dyn Authentication>>,
}

impl Authentications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scheme: impl Authentication + 'static) -> Self {
        self.schemes.push(Arc::new(scheme));
        self
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    fn select(&self, route: &Route) -> Option<&Arc<dyn Authentication>> {
        self.schemes.iter().find(|scheme| scheme.applies(route))
    }
}

impl Authentication for Authentications {
    fn applies(&self, route: &Route) -> bool {
        self.select(route).is_some()
    }

    fn authenticate(&self, route: &Route) -> Option<Arc<dyn Identity>> {
        self.select(route)?.authenticate(route)
    }
}
