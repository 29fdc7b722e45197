//! Unified error type.
//!
//! Routing misses are not errors: [`Router::dispatch`](crate::Router::dispatch)
//! returns `None` and the server answers 404. `Error` covers everything that
//! is actually wrong: a bad route pattern at registration time, a body the
//! binder cannot make sense of, and infrastructure failures around the
//! listener socket.

use thiserror::Error;

/// The error type returned by vico's fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A route pattern failed validation at registration time.
    ///
    /// Fatal for that registration: the route is rejected, nothing is added
    /// to the router.
    #[error("malformed route pattern `{pattern}`: {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// The request body could not be parsed under its declared content type.
    ///
    /// The server answers 400 Bad Request.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// The request body exceeded the configured size cap.
    ///
    /// Raised before any parameter tree is built. The server answers
    /// 413 Content Too Large.
    #[error("request body exceeds the {limit}-byte limit")]
    PayloadTooLarge { limit: usize },

    /// One base key was used both as an array (`key[]`) and as a map
    /// (`key[sub]`) within the same request.
    ///
    /// The container kind is ambiguous, so the request is rejected rather
    /// than silently merged. The server answers 400 Bad Request.
    #[error("conflicting container kinds for parameter `{key}`")]
    BinderConflict { key: String },

    /// The client went away while the body was being read.
    #[error("client disconnected while sending the request body")]
    ClientDisconnected,

    /// Listener-level I/O failure: binding the port or accepting a connection.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPattern { pattern: pattern.to_owned(), reason: reason.into() }
    }

    pub(crate) fn malformed_body(reason: impl Into<String>) -> Self {
        Self::MalformedBody(reason.into())
    }
}
