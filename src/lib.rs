//! # stanza
//!
//! Immutable HTTP messages and a controller pipeline for services behind a
//! reverse proxy.
//!
//! ## The pieces
//!
//! - [`Uri`], [`Stream`], [`Request`], [`Response`]: value types. Every
//!   `with_*` returns a modified copy and leaves the original untouched.
//! - [`Controller`]: authenticate, run middleware, authorize, read the
//!   body, process it, render the [`Outcome`]. Failures become responses.
//! - [`Middleware`]: priority-ordered hooks around the pipeline.
//!   [`Cors`] is the one shipped with the crate.
//! - [`Router`] and [`Server`]: radix-tree routing via [`matchit`] and a
//!   hyper server with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use stanza::{
//!     Controller, Cors, CorsPolicy, Failure, Method, Outcome, Payload, Processor, Responder,
//!     Response, Route, Router, Server,
//! };
//!
//! struct Hello;
//!
//! impl Processor for Hello {
//!     fn outcome(&self, route: &mut Route, _body: &Payload) -> Result<Outcome, Failure> {
//!         let name = route.argument("name").unwrap_or("world");
//!         Ok(Outcome::complete(format!("hello, {name}")))
//!     }
//! }
//!
//! impl Responder for Hello {
//!     fn response(&self, _route: &mut Route, outcome: &Outcome) -> Result<Response, Failure> {
//!         Ok(Response::text(outcome.payload().as_text().unwrap_or_default()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stanza::Error> {
//!     let hello = Controller::builder()
//!         .requester(stanza::EmptyBody)
//!         .processor(Hello)
//!         .responder(Hello)
//!         .cors(Cors::with_policy(CorsPolicy::permissive()))
//!         .build();
//!
//!     let app = Router::new().on(Method::Get, "/hello/{name}", "hello", hello);
//!
//!     Server::bind("0.0.0.0:3000").await?.serve(app).await;
//!     Ok(())
//! }
//! ```

mod auth;
mod context;
mod controller;
mod environment;
mod error;
mod headers;
mod message;
mod method;
mod outcome;
mod pipeline;
mod request;
mod response;
mod route;
mod router;
mod server;
mod stream;
mod uri;

pub mod config;
pub mod cors;
pub mod middleware;

pub use auth::{Authentication, Authentications, Authorization};
pub use config::Config;
pub use context::{Context, ContextFactory, DefaultContextFactory};
pub use controller::{Controller, ControllerBuilder};
pub use cors::{Cors, CorsCapable, CorsPolicy, Preflight};
pub use environment::Environment;
pub use error::{Error, Failure};
pub use headers::Headers;
pub use message::{DEFAULT_PROTOCOL_VERSION, Message};
pub use method::Method;
pub use middleware::{Middleware, MiddlewareFactory};
pub use outcome::{Outcome, Payload};
pub use pipeline::{EmptyBody, Pipeline, Processor, RawBody, Requester, Responder};
pub use request::Request;
pub use response::{ContentType, Response};
pub use route::{Identity, Route};
pub use router::Router;
pub use server::Server;
pub use stream::Stream;
pub use uri::{QueryValue, Uri};
