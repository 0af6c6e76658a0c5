use std::sync::{Arc, Mutex};

use stanza::{
    Authentication, Authorization, Context, Controller, Failure, Identity, Message, Middleware, Outcome,
    Payload, Pipeline, Processor, RawBody, Request, Requester, Responder, Response, Route,
};

type Log = Arc<Mutex<Vec<String>>>;

struct Recording {
    name: &'static str,
    priority: i32,
    log: Log,
}

impl Middleware for Recording {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn on_request(&self, _route: &mut Route, _pipeline: &Pipeline<'_>) -> Result<(), Failure> {
        self.log.lock().unwrap().push(format!("in:{}", self.name));
        Ok(())
    }

    fn on_response(&self, _route: &mut Route, response: Response, _pipeline: &Pipeline<'_>) -> Result<Response, Failure> {
        self.log.lock().unwrap().push(format!("out:{}", self.name));
        Ok(response)
    }
}

struct Echo;

impl Processor for Echo {
    fn outcome(&self, _route: &mut Route, body: &Payload) -> Result<Outcome, Failure> {
        Ok(Outcome::complete(body.clone()))
    }
}

/// Renders successes only; failures fall through to default rendering.
struct Plain;

impl Responder for Plain {
    fn applies(&self, _route: &Route, outcome: &Outcome) -> bool {
        outcome.is_success()
    }

    fn response(&self, _route: &mut Route, outcome: &Outcome) -> Result<Response, Failure> {
        Ok(Response::text(outcome.payload().as_text().unwrap_or_default()))
    }
}

fn route(request: Request) -> Route {
    Route::new("test", request, Context::new())
}

fn post(body: &'static str) -> Route {
    route(Request::parse("POST", "http://api.test/items").unwrap().with_body(body))
}

#[test]
fn middleware_runs_by_priority_and_unwinds_in_reverse() {
    let log = Log::default();
    let recording = |name, priority| Recording { name, priority, log: Arc::clone(&log) };

    let controller = Controller::builder()
        .middleware(recording("a", -1))
        .middleware(recording("b", 0))
        .middleware(recording("c", 0))
        .middleware(recording("d", 1))
        .requester(RawBody)
        .processor(Echo)
        .responder(Plain)
        .build();

    let response = controller.handle(&mut post("hi"));
    assert_eq!(response.body().to_string(), "hi");
    assert_eq!(
        *log.lock().unwrap(),
        ["in:d", "in:b", "in:c", "in:a", "out:a", "out:c", "out:b", "out:d"]
    );
}

#[test]
fn factory_middleware_joins_the_static_stack() {
    let log = Log::default();
    let factory_log = Arc::clone(&log);

    let controller = Controller::builder()
        .middleware(Recording { name: "static", priority: 0, log: Arc::clone(&log) })
        .middleware_factory(move |route: &Route| -> Vec<Arc<dyn Middleware>> {
            let name = if route.name() == "test" { "dynamic" } else { "other" };
            vec![Arc::new(Recording { name, priority: 5, log: Arc::clone(&factory_log) })]
        })
        .requester(RawBody)
        .processor(Echo)
        .responder(Plain)
        .build();

    controller.handle(&mut post(""));
    assert_eq!(*log.lock().unwrap(), ["in:dynamic", "in:static", "out:static", "out:dynamic"]);
}

#[test]
fn invalid_body_short_circuits_to_a_500() {
    struct Strict;
    impl Requester for Strict {
        fn body(&self, route: &mut Route) -> Result<Payload, Failure> {
            let body = route.request().body().to_string();
            serde_json::from_str(&body)
                .map(Payload::Json)
                .map_err(|_| Failure::InvalidBody("Body is not JSON.".to_owned()))
        }
    }

    struct Unreachable;
    impl Processor for Unreachable {
        fn outcome(&self, _route: &mut Route, _body: &Payload) -> Result<Outcome, Failure> {
            panic!("processor must not run after a body failure");
        }
    }

    let controller = Controller::builder().requester(Strict).processor(Unreachable).responder(Plain).build();

    let response = controller.handle(&mut post("{not json"));
    assert_eq!(response.status(), 500);
    assert_eq!(response.body().to_string(), "Body is not JSON.");
    assert!(response.header_line("Content-Type").starts_with("text/plain"));
}

// ── Authentication and authorization ─────────────────────────────────────────

#[derive(Debug)]
struct User(String);

impl Identity for User {
    fn id(&self) -> &str {
        &self.0
    }
}

struct Bearer;

impl Authentication for Bearer {
    fn applies(&self, route: &Route) -> bool {
        route.request().has_header("Authorization")
    }

    fn authenticate(&self, route: &Route) -> Option<Arc<dyn Identity>> {
        let line = route.request().header_line("Authorization");
        let token = line.strip_prefix("Bearer ")?;
        (token == "secret").then(|| Arc::new(User("alice".to_owned())) as Arc<dyn Identity>)
    }
}

struct SignedIn;

impl Authorization for SignedIn {
    fn authorize(&self, route: &Route) -> bool {
        route.is_authenticated()
    }
}

struct WhoAmI;

impl Processor for WhoAmI {
    fn outcome(&self, route: &mut Route, _body: &Payload) -> Result<Outcome, Failure> {
        let id = route.identity().map(|i| i.id().to_owned()).unwrap_or_default();
        Ok(Outcome::complete(id))
    }
}

fn guarded() -> Controller {
    Controller::builder()
        .authentication(Bearer)
        .authorization(SignedIn)
        .requester(RawBody)
        .processor(WhoAmI)
        .responder(Plain)
        .build()
}

#[test]
fn authenticated_callers_reach_the_processor() {
    let request = Request::parse("GET", "/me").unwrap().with_header("Authorization", "Bearer secret").unwrap();
    let response = guarded().handle(&mut route(request));
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().to_string(), "alice");
}

#[test]
fn anonymous_and_bad_tokens_are_denied() {
    for request in [
        Request::parse("GET", "/me").unwrap(),
        Request::parse("GET", "/me").unwrap().with_header("Authorization", "Bearer wrong").unwrap(),
    ] {
        let response = guarded().handle(&mut route(request));
        assert_eq!(response.status(), 403);
        assert_eq!(response.body().to_string(), "Access denied.");
    }
}

#[test]
fn authorization_sees_middleware_changes() {
    struct Impersonate;
    impl Middleware for Impersonate {
        fn on_request(&self, route: &mut Route, _pipeline: &Pipeline<'_>) -> Result<(), Failure> {
            route.set_identity(Some(Arc::new(User("service".to_owned()))));
            Ok(())
        }
    }

    let controller = Controller::builder()
        .authorization(SignedIn)
        .middleware(Impersonate)
        .requester(RawBody)
        .processor(WhoAmI)
        .responder(Plain)
        .build();

    let response = controller.handle(&mut route(Request::parse("GET", "/me").unwrap()));
    assert_eq!(response.body().to_string(), "service");
}

// ── Failure rendering ────────────────────────────────────────────────────────

#[test]
fn middleware_failures_render_through_responders() {
    struct Maintenance;
    impl Middleware for Maintenance {
        fn on_request(&self, _route: &mut Route, _pipeline: &Pipeline<'_>) -> Result<(), Failure> {
            Err(Failure::Unavailable("Down for maintenance.".to_owned()))
        }
    }

    struct Everything;
    impl Responder for Everything {
        fn applies(&self, _route: &Route, _outcome: &Outcome) -> bool {
            true
        }

        fn response(&self, _route: &mut Route, outcome: &Outcome) -> Result<Response, Failure> {
            let body = format!("{}: {}", outcome.status(), outcome.payload().as_text().unwrap_or_default());
            Ok(Response::text(body).with_status(outcome.status(), "")?)
        }
    }

    let controller = Controller::builder()
        .middleware(Maintenance)
        .requester(RawBody)
        .processor(Echo)
        .responder(Everything)
        .build();

    let response = controller.handle(&mut post("ignored"));
    assert_eq!(response.status(), 400);
    assert_eq!(response.body().to_string(), "400: Down for maintenance.");
}

#[test]
fn responder_failures_fall_back_to_a_bare_response() {
    struct Broken;
    impl Responder for Broken {
        fn response(&self, _route: &mut Route, _outcome: &Outcome) -> Result<Response, Failure> {
            Err(Failure::error(503, "Renderer offline."))
        }
    }

    let controller = Controller::builder().requester(RawBody).processor(Echo).responder(Broken).build();

    let response = controller.handle(&mut post("x"));
    assert_eq!(response.status(), 503);
    assert_eq!(response.body().to_string(), "Renderer offline.");
}

#[test]
fn outbound_middleware_may_rewrite_the_response() {
    struct Stamp;
    impl Middleware for Stamp {
        fn on_response(&self, route: &mut Route, response: Response, _pipeline: &Pipeline<'_>) -> Result<Response, Failure> {
            Ok(response.with_header("X-Route", route.name())?)
        }
    }

    let controller = Controller::builder().middleware(Stamp).requester(RawBody).processor(Echo).responder(Plain).build();
    let response = controller.handle(&mut post("x"));
    assert_eq!(response.header_line("X-Route"), "test");
}

#[test]
fn outbound_middleware_failures_become_a_bare_response() {
    struct Reject;
    impl Middleware for Reject {
        fn on_response(&self, _route: &mut Route, _response: Response, _pipeline: &Pipeline<'_>) -> Result<Response, Failure> {
            Err(Failure::error(502, "Upstream mangled the response."))
        }
    }

    let log = Log::default();
    let controller = Controller::builder()
        .middleware(Recording { name: "inner", priority: -1, log: Arc::clone(&log) })
        .middleware(Reject)
        .middleware(Recording { name: "outer", priority: 1, log: Arc::clone(&log) })
        .requester(RawBody)
        .processor(Echo)
        .responder(Plain)
        .build();

    let response = controller.handle(&mut post("x"));
    assert_eq!(response.status(), 502);
    assert_eq!(response.body().to_string(), "Upstream mangled the response.");
    assert!(response.header_line("Content-Type").starts_with("text/plain"));
    // Nothing after the failing layer sees the response.
    assert_eq!(*log.lock().unwrap(), ["in:outer", "in:inner", "out:inner"]);
}
