//! The [`Cors`] middleware.

use tracing::debug;

use crate::cors::{
    Aggregate, Allowed, CONTEXT_HEADERS, CONTEXT_MODE, CorsCapable, CorsHeaders, CorsMode, CorsPolicy,
    SIMPLE_RESPONSE_HEADERS, WILDCARD, normalize_origin,
};
use crate::error::Failure;
use crate::headers::normalize_name;
use crate::message::Message;
use crate::method::Method;
use crate::middleware::Middleware;
use crate::pipeline::Pipeline;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

const ORIGIN: &str = "Origin";
const REQUEST_METHOD: &str = "Access-Control-Request-Method";
const REQUEST_HEADERS: &str = "Access-Control-Request-Headers";

const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
const EXPOSE_HEADERS: &str = "Access-Control-Expose-Headers";
const MAX_AGE: &str = "Access-Control-Max-Age";
const VARY: &str = "Vary";

/// CORS negotiation as middleware.
///
/// Runs at priority 1000, so it sees the request first and the response
/// last. Requests without an `Origin` header pass through untouched.
/// Cross-origin requests are checked against the merged policy of every
/// participant; a rejection fails the pipeline with a `401`
/// [`Failure::Cors`]. Accepted requests get their response headers computed
/// up front, stashed in the context under [`CONTEXT_HEADERS`] and applied in
/// the response phase.
#[derive(Clone, Debug)]
pub struct Cors {
    priority: i32,
    policy: Option<CorsPolicy>,
}

impl Cors {
    pub const DEFAULT_PRIORITY: i32 = 1000;

    /// Negotiates purely from the other participants' declarations.
    pub fn new() -> Self {
        Self { priority: Self::DEFAULT_PRIORITY, policy: None }
    }

    /// Adds `policy` to whatever the other participants declare.
    pub fn with_policy(policy: CorsPolicy) -> Self {
        Self { priority: Self::DEFAULT_PRIORITY, policy: Some(policy) }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn preflight(&self, request: &Request, origin: &str, cors: &Aggregate) -> Result<CorsHeaders, Failure> {
        let method = request.header_line(REQUEST_METHOD).trim().to_ascii_uppercase();
        if !cors.methods.allows(&method) {
            return Err(Failure::cors("Request method not supported."));
        }

        let requested = requested_headers(request);
        let supported = match &cors.headers {
            Allowed::Any => true,
            Allowed::Only(allowed) => requested.iter().all(|h| allowed.contains(h)),
        };
        if !supported {
            return Err(Failure::cors("Request headers not supported."));
        }

        // A preflight is itself an OPTIONS request, so the allowed methods
        // always go out, simple ones included.
        let mut headers = common_headers(origin, cors);
        let methods = match &cors.methods {
            Allowed::Any => method.clone(),
            Allowed::Only(methods) => methods.join(", "),
        };
        headers.set(ALLOW_METHODS, methods);
        if !requested.is_empty() {
            let allowed = match &cors.headers {
                Allowed::Any => requested.join(", "),
                Allowed::Only(allowed) => allowed.join(", "),
            };
            if !allowed.is_empty() {
                headers.set(ALLOW_HEADERS, allowed);
            }
        }
        if let Some(max_age) = cors.max_age {
            headers.set(MAX_AGE, max_age.to_string());
        }
        Ok(headers)
    }

    fn simple(&self, origin: &str, cors: &Aggregate) -> CorsHeaders {
        let mut headers = common_headers(origin, cors);
        let exposed = match &cors.exposed {
            Allowed::Any if !cors.credentials => Some(WILDCARD.to_owned()),
            Allowed::Any => None,
            Allowed::Only(exposed) => {
                let exposed: Vec<&str> = exposed
                    .iter()
                    .map(String::as_str)
                    .filter(|h| !SIMPLE_RESPONSE_HEADERS.contains(h))
                    .collect();
                (!exposed.is_empty()).then(|| exposed.join(", "))
            }
        };
        if let Some(exposed) = exposed {
            headers.set(EXPOSE_HEADERS, exposed);
        }
        headers
    }
}

impl Default for Cors {
    fn default() -> Self { Self::new() }
}

impl Middleware for Cors {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn on_request(&self, route: &mut Route, pipeline: &Pipeline<'_>) -> Result<(), Failure> {
        let request = route.request();
        if !request.has_header(ORIGIN) {
            return Ok(());
        }
        let origin = request.header_line(ORIGIN);
        let cors = Aggregate::collect(pipeline.cors(), route);

        if !cors.origins.allows(&normalize_origin(&origin)) {
            debug!(%origin, "cors origin rejected");
            return Err(Failure::cors("Request not being made from an allowed origin."));
        }

        let (mode, headers) = if is_preflight(request) {
            (CorsMode::Preflight, self.preflight(request, &origin, &cors)?)
        } else {
            (CorsMode::Request, self.simple(&origin, &cors))
        };
        debug!(%origin, ?mode, "cors accepted");

        let context = route.context_mut();
        context.set(CONTEXT_MODE, mode);
        context.set(CONTEXT_HEADERS, headers);
        Ok(())
    }

    fn on_response(
        &self,
        route: &mut Route,
        response: Response,
        _pipeline: &Pipeline<'_>,
    ) -> Result<Response, Failure> {
        let Some(headers) = route.context().get::<CorsHeaders>(CONTEXT_HEADERS) else {
            return Ok(response);
        };

        let mut response = response;
        for (name, value) in headers.iter() {
            response = if name == VARY {
                let present = response
                    .header(VARY)
                    .iter()
                    .flat_map(|line| line.split(','))
                    .any(|v| v.trim().eq_ignore_ascii_case(value));
                if present { response } else { response.with_added_header(VARY, value)? }
            } else {
                response.with_header(name, value)?
            };
        }
        Ok(response)
    }

    fn cors(&self) -> Option<&dyn CorsCapable> {
        self.policy.as_ref().map(|policy| policy as &dyn CorsCapable)
    }
}

fn is_preflight(request: &Request) -> bool {
    request.method() == Method::Options && request.has_header(REQUEST_METHOD)
}

/// `Access-Control-Request-Headers`, split and title-cased.
fn requested_headers(request: &Request) -> Vec<String> {
    request
        .header(REQUEST_HEADERS)
        .iter()
        .flat_map(|line| line.split(','))
        .map(normalize_name)
        .filter(|h| !h.is_empty())
        .collect()
}

/// `Vary`, `Access-Control-Allow-Origin` and, under credentials,
/// `Access-Control-Allow-Credentials`.
fn common_headers(origin: &str, cors: &Aggregate) -> CorsHeaders {
    let mut headers = CorsHeaders::default();
    headers.set(VARY, ORIGIN);
    if cors.credentials {
        headers.set(ALLOW_ORIGIN, origin);
        headers.set(ALLOW_CREDENTIALS, "true");
    } else if cors.origins == Allowed::Any {
        headers.set(ALLOW_ORIGIN, WILDCARD);
    } else {
        headers.set(ALLOW_ORIGIN, origin);
    }
    headers
}
