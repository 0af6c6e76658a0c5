//! Minimal stanza example: a JSON user endpoint behind CORS.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic [config.toml]
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -i -X OPTIONS http://localhost:3000/users/42 \
//!        -H 'origin: https://app.example.com' \
//!        -H 'access-control-request-method: DELETE'

use std::sync::Arc;

use serde_json::json;
use stanza::{
    Config, ContentType, Controller, Cors, CorsPolicy, Failure, Message, Method, Outcome, Payload,
    Processor, Requester, Responder, Response, Route, Router, Server, config,
};

/// Reads the body as JSON; anything else is rejected before processing.
struct JsonBody;

impl Requester for JsonBody {
    fn body(&self, route: &mut Route) -> Result<Payload, Failure> {
        let raw = route.request().body().bytes();
        if raw.is_empty() {
            return Ok(Payload::Empty);
        }
        serde_json::from_slice(&raw)
            .map(Payload::Json)
            .map_err(|e| Failure::InvalidBody(format!("Malformed JSON: {e}")))
    }
}

struct Users;

impl Processor for Users {
    fn outcome(&self, route: &mut Route, body: &Payload) -> Result<Outcome, Failure> {
        match route.name() {
            "user.show" => {
                let id = route.argument("id").unwrap_or("unknown");
                Ok(Outcome::complete(json!({ "id": id, "name": "alice" })))
            }
            "user.create" => {
                let name = body
                    .as_json()
                    .and_then(|b| b["name"].as_str())
                    .ok_or_else(|| Failure::Unavailable("A name is required.".to_owned()))?;
                Ok(Outcome::complete(json!({ "id": "99", "name": name })))
            }
            "user.delete" => Ok(Outcome::delayed(Payload::Empty)),
            _ => Err(Failure::error(0, "Unknown route.")),
        }
    }
}

struct Json;

impl Responder for Json {
    fn applies(&self, _route: &Route, outcome: &Outcome) -> bool {
        outcome.status() == Outcome::COMPLETE
    }

    fn response(&self, _route: &mut Route, outcome: &Outcome) -> Result<Response, Failure> {
        Ok(Response::new().with_content(ContentType::Json, outcome.payload().to_bytes()))
    }
}

#[tokio::main]
async fn main() -> Result<(), stanza::Error> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    let policy = config.cors.clone().unwrap_or_else(|| {
        CorsPolicy::default()
            .allow_origin("https://app.example.com")
            .allow_methods(["GET", "POST", "DELETE"])
            .max_age(600)
    });

    let users = Arc::new(
        Controller::builder()
            .requester(JsonBody)
            .processor(Users)
            .responder(Json)
            .cors(Cors::with_policy(policy))
            .build(),
    );

    let app = Router::new()
        .on(Method::Get,     "/users/{id}", "user.show",   Arc::clone(&users))
        .on(Method::Options, "/users/{id}", "user.show",   Arc::clone(&users))
        .on(Method::Post,    "/users",      "user.create", Arc::clone(&users))
        .on(Method::Delete,  "/users/{id}", "user.delete", users);

    Server::from_config(&config.server).await?.serve(app).await;
    Ok(())
}
