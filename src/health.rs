//! Built-in health-check handlers.
//!
//! Register them like any other route:
//!
//! ```rust,no_run
//! use vico::{Router, health};
//!
//! # fn main() -> Result<(), vico::Error> {
//! let app = Router::new()
//!     .get("/healthz", health::liveness)?
//!     .get("/readyz", health::readiness)?;
//! # Ok(()) }
//! ```
//!
//! Replace `readiness` with your own handler if serving traffic depends on
//! a warm-up step or downstream availability.

use crate::{Params, Request, Response};

/// Liveness probe handler.
///
/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all,
/// it is alive; this handler intentionally has no dependencies.
pub async fn liveness(_req: Request, _params: Params) -> Response {
    Response::text("ok")
}

/// Readiness probe handler (default implementation).
///
/// Always `200 OK` with body `"ready"`.
pub async fn readiness(_req: Request, _params: Params) -> Response {
    Response::text("ready")
}
