//! First-match-wins request router.
//!
//! Routes live in one ordered list and are scanned in registration order;
//! the first route whose method and segments match wins and scanning stops.
//! That is the contract, not an optimization: register specific patterns
//! before wide ones.
//!
//! ```rust,no_run
//! # use vico::{Method, Params, Request, Response, Router};
//! # async fn list_users(_: Request, _: Params) -> Response { Response::text("") }
//! # async fn get_user(_: Request, _: Params) -> Response { Response::text("") }
//! # fn main() -> Result<(), vico::Error> {
//! let app = Router::new()
//!     .get("/users/list", list_users)?   // must come first …
//!     .get("/users/:id", get_user)?;     // … or `:id` would swallow it
//! # Ok(()) }
//! ```
//!
//! A registration that is fully shadowed by an earlier one is dead; it is
//! kept (the list is append-only) but logged with `tracing::warn!` so the
//! mistake is visible at startup.

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::method::Method;
use crate::params::Params;
use crate::pattern::Pattern;
use crate::request::Request;
use crate::response::Response;

struct Route {
    method: Method,
    pattern: Pattern,
    handler: BoxedHandler,
}

/// A successful dispatch: the winning route's handler plus its captures.
pub struct RouteMatch {
    handler: BoxedHandler,
    captures: Vec<(String, String)>,
}

impl RouteMatch {
    /// The captured path segments, in path order, percent-decoded. Hand
    /// these to [`Binder::bind`](crate::Binder::bind).
    pub fn captures(&self) -> &[(String, String)] {
        &self.captures
    }

    /// Invokes the matched handler.
    pub fn call(&self, req: Request, params: Params) -> impl Future<Output = Response> + Send {
        self.handler.call(req, params)
    }
}

/// The application router.
///
/// Build it once at startup, then hand it to
/// [`Server::serve`](crate::Server::serve). After that it is read-only and
/// shared across connection tasks without locking. Registration returns
/// `Result<Self, Error>` so a malformed pattern rejects that route via `?`.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a method + pattern pair.
    ///
    /// Patterns use `:name` capture segments: `/hello/:name` matches
    /// `/hello/Alice` and binds `name = "Alice"`. Fails with
    /// [`Error::MalformedPattern`] if the pattern does not parse; nothing
    /// is registered in that case.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        let pattern = Pattern::parse(pattern)?;

        if let Some(earlier) = self
            .routes
            .iter()
            .find(|r| r.method == method && pattern.is_shadowed_by(&r.pattern))
        {
            warn!(
                method = %method,
                pattern = %pattern,
                shadowed_by = %earlier.pattern,
                "route is unreachable: an earlier registration matches every path it would"
            );
        }

        self.routes.push(Route {
            method,
            pattern,
            handler: handler.into_boxed_handler(),
        });
        Ok(self)
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::Put, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::Delete, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn head(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::Head, pattern, handler)
    }

    /// Matches a request against the registered routes.
    ///
    /// Scans in registration order and returns the first match together
    /// with its captures. `None` means no route matched; the boundary
    /// answers 404, it is not an error.
    pub fn dispatch(&self, method: Method, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            if route.method != method {
                return None;
            }
            let captures = route.pattern.match_path(path)?;
            Some(RouteMatch { handler: Arc::clone(&route.handler), captures })
        })
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn named(_req: Request, _params: Params) -> Response {
        Response::text("named")
    }

    async fn wide(_req: Request, _params: Params) -> Response {
        Response::text("wide")
    }

    async fn call(router: &Router, method: Method, path: &str) -> Option<(Vec<u8>, Vec<(String, String)>)> {
        let matched = router.dispatch(method, path)?;
        let captures = matched.captures().to_vec();
        let req = Request::new(method, path, "", Vec::new(), bytes::Bytes::new());
        let resp = matched.call(req, Params::new()).await;
        Some((resp.body().to_vec(), captures))
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let router = Router::new()
            .get("/users/list", named).unwrap()
            .get("/users/:id", wide).unwrap();

        let (body, captures) = call(&router, Method::Get, "/users/list").await.unwrap();
        assert_eq!(body, b"named");
        assert!(captures.is_empty());

        let (body, captures) = call(&router, Method::Get, "/users/42").await.unwrap();
        assert_eq!(body, b"wide");
        assert_eq!(captures, vec![("id".to_owned(), "42".to_owned())]);
    }

    #[tokio::test]
    async fn later_overlapping_route_is_never_selected() {
        // Registered the "wrong" way round: the capture route shadows the
        // literal one, and first-match-wins means the literal never fires.
        let router = Router::new()
            .get("/users/:id", wide).unwrap()
            .get("/users/list", named).unwrap();

        let (body, _) = call(&router, Method::Get, "/users/list").await.unwrap();
        assert_eq!(body, b"wide");
    }

    #[test]
    fn method_must_match() {
        let router = Router::new().get("/users", named).unwrap();
        assert!(router.dispatch(Method::Post, "/users").is_none());
        assert!(router.dispatch(Method::Get, "/users").is_some());
    }

    #[test]
    fn no_match_is_none_not_an_error() {
        let router = Router::new().get("/users", named).unwrap();
        assert!(router.dispatch(Method::Get, "/missing").is_none());
        assert!(router.dispatch(Method::Get, "/users/extra").is_none());
    }

    #[test]
    fn malformed_pattern_rejects_the_registration() {
        let result = Router::new().get("/users/:", named);
        assert!(matches!(result, Err(Error::MalformedPattern { .. })));
    }

    #[test]
    fn routes_count_registrations_in_order() {
        let router = Router::new()
            .get("/a", named).unwrap()
            .post("/a", wide).unwrap();
        assert_eq!(router.len(), 2);
        assert!(!router.is_empty());
    }
}
