//! # vico
//!
//! A small routing and parameter-binding layer for HTTP services.
//!
//! ## The contract
//!
//! Two pieces do the work; everything else is plumbing around them:
//!
//! - **Router**: an ordered list of `method + pattern` routes, scanned in
//!   registration order. The first match wins and scanning stops, so put
//!   specific patterns before wide ones. Patterns mix literal segments with
//!   `:name` captures; there are no wildcard tails.
//! - **Binder**: merges query-string pairs, form-encoded or multipart body
//!   fields, and route captures into one [`Params`] tree per request.
//!   Bracketed keys nest (`user[name]`) and accumulate (`colors[]`);
//!   colliding bare keys are overwritten query → body → captures, so route
//!   captures always win.
//!
//! Handlers receive the [`Request`] and the bound [`Params`] as explicit
//! arguments. There is no ambient request state to reach into.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vico::{Params, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vico::Error> {
//!     let app = Router::new()
//!         .get("/hello/:name", hello)?
//!         .post("/signup", signup)?;
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn hello(_req: Request, params: Params) -> Response {
//!     let name = params.text("name").unwrap_or("world");
//!     Response::text(format!("hello, {name}"))
//! }
//!
//! async fn signup(_req: Request, params: Params) -> Response {
//!     // POST body `user[name]=Bob&user[email]=b@x.com` arrives nested:
//!     let name = params.map("user").and_then(|u| u.text("name"));
//!     Response::text(format!("welcome, {}", name.unwrap_or("stranger")))
//! }
//! ```

mod error;
mod handler;
mod method;
mod multipart;
mod params;
mod pattern;
mod request;
mod response;
mod router;
mod server;

pub mod health;

pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use params::{Binder, Params, UploadedFile, Value, DEFAULT_BODY_LIMIT};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::{RouteMatch, Router};
pub use server::Server;

pub use http::StatusCode;
