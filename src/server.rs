//! HTTP server boundary and graceful shutdown.
//!
//! The server owns the transport: it accepts connections, buffers each
//! request body under the configured cap, runs the router and the binder,
//! and maps their typed failures onto status codes:
//!
//! | outcome                          | status |
//! |----------------------------------|--------|
//! | no route matched                 | 404    |
//! | unknown request method           | 405    |
//! | malformed body / binder conflict | 400    |
//! | body over the cap                | 413    |
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting immediately, lets every
//! in-flight connection task run to completion, then returns from
//! [`Server::serve`]. Size your orchestrator's grace period to your slowest
//! request.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::method::Method;
use crate::params::{Binder, DEFAULT_BODY_LIMIT};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Caps request bodies at `limit` bytes. Bodies over the cap are
    /// rejected with 413 before any parameter binding happens.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // The router is immutable from here on; Arc shares it across
        // connection tasks without copying the route list.
        let router = Arc::new(router);
        let binder = Binder::with_body_limit(self.body_limit);

        info!(addr = %self.addr, routes = router.len(), "vico listening");

        // JoinSet tracks every spawned connection task so shutdown can wait
        // for them all.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` checks arms top-to-bottom: a shutdown signal
                // stops accepting even when more connections are queued.
                biased;

                () = &mut shutdown => {
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
                        // The closure runs once per request on the
                        // connection, not once per connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, binder, req).await }
                        });

                        // auto::Builder serves whichever of HTTP/1.1 and
                        // HTTP/2 the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not
                // grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: every in-flight connection finishes before we return.
        while tasks.join_next().await.is_some() {}

        info!("vico stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Core hot path: routes one request, binds its parameters, and produces one
/// response.
///
/// The error type is [`Infallible`](std::convert::Infallible): every
/// failure becomes a status-coded response, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    binder: Binder,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    let Ok(method) = Method::try_from(&parts.method) else {
        debug!(method = %parts.method, "unknown request method");
        return Ok(Response::status(StatusCode::METHOD_NOT_ALLOWED).into_http());
    };
    let path = parts.uri.path().to_owned();
    let query = parts.uri.query().unwrap_or_default().to_owned();

    let Some(matched) = router.dispatch(method, &path) else {
        debug!(%method, %path, "no route matched");
        return Ok(Response::status(StatusCode::NOT_FOUND).into_http());
    };

    let body = match read_body(body, binder.body_limit()).await {
        Ok(body) => body,
        Err(e) => {
            debug!(%method, %path, "rejecting body: {e}");
            return Ok(error_response(&e).into_http());
        }
    };

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let request = Request::new(method, path, query, headers, body);
    let params = match binder.bind(&request, matched.captures()) {
        Ok(params) => params,
        Err(e) => {
            debug!(method = %request.method(), path = %request.path(), "binding failed: {e}");
            return Ok(error_response(&e).into_http());
        }
    };

    Ok(matched.call(request, params).await.into_http())
}

/// Buffers the request body, enforcing the byte cap while reading so an
/// oversized body never sits fully in memory.
async fn read_body(body: hyper::body::Incoming, limit: usize) -> Result<Bytes, Error> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() => {
            Err(Error::PayloadTooLarge { limit })
        }
        Err(_) => Err(Error::ClientDisconnected),
    }
}

fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        Error::MalformedBody(_)
        | Error::BinderConflict { .. }
        | Error::ClientDisconnected => StatusCode::BAD_REQUEST,
        Error::MalformedPattern { .. } | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Response::builder().status(status).text(err.to_string())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both SIGTERM (sent by orchestrators) and SIGINT
/// (Ctrl-C, for local dev). On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_responses_carry_the_documented_status() {
        let resp = error_response(&Error::PayloadTooLarge { limit: 16 });
        assert_eq!(resp.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = error_response(&Error::malformed_body("bad framing"));
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

        let resp = error_response(&Error::BinderConflict { key: "c".into() });
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    }
}
