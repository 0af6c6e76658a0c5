//! HTTP server and graceful shutdown.
//!
//! The server is a thin adapter: hyper parses the wire, the body is
//! collected, and the result becomes an immutable [`Request`] handed to the
//! [`Router`]. The [`Response`] goes back out the same way.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Stops `listener.accept()` immediately.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], so `main` can exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::headers::normalize_name;
use crate::message::Message;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::uri::Uri;

/// A bound HTTP listener.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Binds `addr` (`host:port`). Port `0` picks a free port; see
    /// [`local_addr`](Server::local_addr).
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), stanza::Error> {
    /// use stanza::Server;
    /// let server = Server::bind("0.0.0.0:3000").await?;
    /// # Ok(()) }
    /// ```
    pub async fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub async fn from_config(config: &ServerConfig) -> Result<Self, Error> {
        let listener = TcpListener::bind(config.socket_addr()?).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, router: Router) {
        self.serve_with_shutdown(router, shutdown_signal()).await;
    }

    /// Serves `router` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown(self, router: Router, signal: impl Future<Output = ()>) {
        let Self { listener } = self;
        let router = Arc::new(router);

        match listener.local_addr() {
            Ok(addr) => info!(%addr, "stanza listening"),
            Err(e) => error!("listener has no local address: {e}"),
        }

        // Every connection task lives here so shutdown can wait on them.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even with a
                // backlog of queued connections.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, remote_addr).await }
                        });

                        // HTTP/1.1 or HTTP/2, whichever the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stanza stopped");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts, routes and answers one request. Every failure is a response, so
/// hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let response = match into_request(req).await {
        Ok(request) => router.handle(request),
        Err(status) => {
            debug!(peer = %remote_addr, %status, "rejected before routing");
            Response::from_status(status)
        }
    };
    Ok(into_http(response))
}

async fn into_request(req: hyper::Request<Incoming>) -> Result<Request, StatusCode> {
    let (parts, body) = req.into_parts();

    let method = Method::try_from(&parts.method).map_err(|_| StatusCode::METHOD_NOT_ALLOWED)?;
    let uri: Uri = absolute_uri(&parts).parse().map_err(|e| {
        debug!("unparseable request target: {e}");
        StatusCode::BAD_REQUEST
    })?;
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("failed to read request body: {e}");
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let mut request = Request::new(method, uri)
        .with_protocol_version(version(parts.version))
        .map_err(|_| StatusCode::HTTP_VERSION_NOT_SUPPORTED)?
        .with_body(body);

    for name in parts.headers.keys() {
        let values = parts
            .headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        request = request
            .with_header_values(&normalize_name(name.as_str()), values)
            .map_err(|_| StatusCode::BAD_REQUEST)?;
    }
    Ok(request)
}

/// HTTP/1 carries only the path; the authority comes from `Host`.
fn absolute_uri(parts: &http::request::Parts) -> String {
    let scheme = parts.uri.scheme_str().unwrap_or("http");
    let authority = parts
        .uri
        .authority()
        .map(|a| a.as_str())
        .or_else(|| parts.headers.get(http::header::HOST).and_then(|h| h.to_str().ok()))
        .unwrap_or("localhost");
    let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{scheme}://{authority}{target}")
}

fn version(version: http::Version) -> &'static str {
    match version {
        http::Version::HTTP_09 => "0.9",
        http::Version::HTTP_10 => "1.0",
        http::Version::HTTP_2  => "2.0",
        http::Version::HTTP_3  => "3.0",
        _                      => "1.1",
    }
}

fn into_http(response: Response) -> http::Response<Full<Bytes>> {
    let mut builder = http::Response::builder().status(response.status());
    for (name, values) in response.headers().iter() {
        for value in values {
            builder = builder.header(name, value.as_str());
        }
    }
    builder.body(Full::new(response.body().bytes())).unwrap_or_else(|e| {
        error!("unrepresentable response: {e}");
        let mut fallback = http::Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). Only Ctrl-C on
/// non-Unix platforms.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
