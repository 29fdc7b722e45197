//! Incoming HTTP request type.
//!
//! A `Request` is plain data: method, path, raw query string, headers, and
//! the buffered body. It is built once per incoming call, handed to the
//! handler together with the bound [`Params`](crate::Params), and dropped
//! when the response goes out. Handlers never reach into ambient state;
//! everything they may consume arrives as an explicit argument.

use bytes::Bytes;

use crate::method::Method;

/// An incoming HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Request {
    /// Builds a request from its parts. The boundary does this for you; it
    /// is public so tests can construct requests without a socket.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: impl Into<String>,
        headers: Vec<(String, String)>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            query: query.into(),
            headers,
            body: body.into(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    /// The raw query string, without the leading `?`. Empty if absent.
    pub fn query_string(&self) -> &str { &self.query }

    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `Content-Type` header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::new(
            Method::Post,
            "/upload",
            "",
            vec![("Content-Type".to_owned(), "text/plain".to_owned())],
            "hi",
        );
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.content_type(), Some("text/plain"));
        assert_eq!(req.header("x-missing"), None);
    }
}
