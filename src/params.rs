//! Parameter tree and the request binder.
//!
//! Three sources of key/value data feed every request: the query string,
//! the body (form-encoded or multipart), and the route captures. The
//! [`Binder`] merges them into a single [`Params`] tree:
//!
//! - `q=sinatra`                          → `{q: "sinatra"}`
//! - `colors[]=red&colors[]=blue`         → `{colors: ["red", "blue"]}`
//! - `user[name]=Bob&user[email]=b@x.com` → `{user: {name: "Bob", email: "b@x.com"}}`
//!
//! Sources are processed query → body → captures. A bare scalar key seen
//! again is overwritten, so route captures always win; route-level data is
//! the most specific. Bracketed keys accumulate into their containers
//! instead, preserving encounter order. Using one base key both as an array
//! (`key[]`) and as a map (`key[sub]`) is ambiguous and rejected with
//! [`Error::BinderConflict`].
//!
//! A fresh tree is built per request and owned by that dispatch; nothing is
//! shared across requests.

use bytes::Bytes;

use crate::error::Error;
use crate::multipart;
use crate::request::Request;

/// Default request-body cap: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// ── UploadedFile ──────────────────────────────────────────────────────────────

/// A file received through a multipart form field.
///
/// The bytes live only as long as the request that carried them. Persist
/// them somewhere durable from your handler if you need them afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub(crate) field_name: String,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) data: Bytes,
}

impl UploadedFile {
    /// The form field this file arrived under.
    pub fn field_name(&self) -> &str { &self.field_name }

    /// The client-supplied filename. Untrusted input: never use it as a
    /// filesystem path without sanitizing.
    pub fn filename(&self) -> &str { &self.filename }

    /// The part's declared content type.
    pub fn content_type(&self) -> &str { &self.content_type }

    /// The file bytes.
    pub fn data(&self) -> &[u8] { &self.data }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// One node of the bound parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A plain text value.
    Text(String),
    /// An uploaded file from a multipart part.
    File(UploadedFile),
    /// An ordered sequence built from `key[]` pairs.
    List(Vec<Value>),
    /// An ordered nested mapping built from `key[sub]` pairs.
    Map(Params),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Params> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

/// The unified parameter mapping handed to handlers.
///
/// Keys are canonical strings; insertion order is preserved. A key that was
/// never sent is simply absent; look it up and decide for yourself whether
/// that is fatal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Shortcut for a text value: `params.text("name")`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Shortcut for an uploaded file: `params.file("avatar")`.
    pub fn file(&self, key: &str) -> Option<&UploadedFile> {
        self.get(key).and_then(Value::as_file)
    }

    /// Shortcut for a `key[]` sequence: `params.list("colors")`.
    pub fn list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    /// Shortcut for a `key[sub]` nested mapping: `params.map("user")`.
    pub fn map(&self, key: &str) -> Option<&Params> {
        self.get(key).and_then(Value::as_map)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Overwrites in place (keeping the key's original position) or appends.
    fn set(&mut self, key: &str, value: Value) {
        match self.get_mut(key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key.to_owned(), value)),
        }
    }

    /// Returns the slot for `key`, inserting `default()` if absent.
    fn slot_or_insert(&mut self, key: &str, default: impl FnOnce() -> Value) -> &mut Value {
        let pos = self.entries.iter().position(|(k, _)| k == key);
        let pos = match pos {
            Some(pos) => pos,
            None => {
                self.entries.push((key.to_owned(), default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }
}

// ── Bracket-key grammar ───────────────────────────────────────────────────────

/// One step below the base key: `[sub]` descends into a map, `[]` appends
/// to a sequence.
#[derive(Debug, PartialEq)]
enum KeyStep<'a> {
    Key(&'a str),
    Append,
}

/// Splits `user[address][city]` into `("user", [Key("address"), Key("city")])`
/// and `colors[]` into `("colors", [Append])`.
///
/// Keys that do not follow the grammar (empty base, unbalanced brackets,
/// text after a closing bracket) are not an error; the whole key is treated
/// as one literal scalar key, the lenient behavior form decoders converge on.
fn parse_key(key: &str) -> Option<(&str, Vec<KeyStep<'_>>)> {
    let open = key.find('[')?;
    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut steps = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let sub = &inner[..close];
        // `[]` is always array-append, never a map key named "".
        steps.push(if sub.is_empty() { KeyStep::Append } else { KeyStep::Key(sub) });
        rest = &inner[close + 1..];
    }
    Some((base, steps))
}

// ── Tree insertion ────────────────────────────────────────────────────────────

/// Inserts one flat pair into the tree, expanding bracket notation.
fn insert_pair(root: &mut Params, key: &str, value: Value) -> Result<(), Error> {
    match parse_key(key) {
        Some((base, steps)) => insert_into_map(root, base, &steps, value, base),
        None => insert_into_map(root, key, &[], value, key),
    }
}

fn insert_into_map(
    map: &mut Params,
    key: &str,
    steps: &[KeyStep<'_>],
    value: Value,
    base: &str,
) -> Result<(), Error> {
    let Some(step) = steps.first() else {
        // Scalar leaf: last write wins, but a key already holding a
        // container cannot collapse back to a scalar.
        if map.get(key).is_some_and(Value::is_container) {
            return Err(Error::BinderConflict { key: base.to_owned() });
        }
        map.set(key, value);
        return Ok(());
    };

    match step {
        KeyStep::Append => {
            let slot = map.slot_or_insert(key, || Value::List(Vec::new()));
            match slot {
                Value::List(items) => insert_into_list(items, &steps[1..], value, base),
                _ => Err(Error::BinderConflict { key: base.to_owned() }),
            }
        }
        KeyStep::Key(sub) => {
            let slot = map.slot_or_insert(key, || Value::Map(Params::new()));
            match slot {
                Value::Map(inner) => insert_into_map(inner, sub, &steps[1..], value, base),
                _ => Err(Error::BinderConflict { key: base.to_owned() }),
            }
        }
    }
}

/// A `[]` step appends: a scalar directly, or a fresh container when more
/// steps follow (`points[][x]=1&points[][y]=2` → `[{x: 1}, {y: 2}]`).
fn insert_into_list(
    items: &mut Vec<Value>,
    steps: &[KeyStep<'_>],
    value: Value,
    base: &str,
) -> Result<(), Error> {
    let Some(step) = steps.first() else {
        items.push(value);
        return Ok(());
    };

    match step {
        KeyStep::Append => {
            items.push(Value::List(Vec::new()));
            let Some(Value::List(inner)) = items.last_mut() else {
                unreachable!("just pushed a list")
            };
            insert_into_list(inner, &steps[1..], value, base)
        }
        KeyStep::Key(sub) => {
            items.push(Value::Map(Params::new()));
            let Some(Value::Map(inner)) = items.last_mut() else {
                unreachable!("just pushed a map")
            };
            insert_into_map(inner, sub, &steps[1..], value, base)
        }
    }
}

// ── Binder ────────────────────────────────────────────────────────────────────

/// Merges query, body, and capture data into one [`Params`] tree.
///
/// Stateless apart from the body cap; build one at startup and share it
/// across requests.
#[derive(Debug, Clone, Copy)]
pub struct Binder {
    max_body: usize,
}

impl Default for Binder {
    fn default() -> Self {
        Self { max_body: DEFAULT_BODY_LIMIT }
    }
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binder that rejects bodies larger than `limit` bytes.
    pub fn with_body_limit(limit: usize) -> Self {
        Self { max_body: limit }
    }

    pub fn body_limit(&self) -> usize {
        self.max_body
    }

    /// Binds a matched request into a parameter tree.
    ///
    /// `captures` are the route captures from dispatch, in path order.
    /// Processing order is query → body → captures; see the module docs for
    /// the merge rules.
    pub fn bind(&self, req: &Request, captures: &[(String, String)]) -> Result<Params, Error> {
        if req.body().len() > self.max_body {
            return Err(Error::PayloadTooLarge { limit: self.max_body });
        }

        let mut pairs: Vec<(String, Value)> = Vec::new();

        for (key, value) in form_urlencoded::parse(req.query_string().as_bytes()) {
            pairs.push((key.into_owned(), Value::Text(value.into_owned())));
        }

        match req.content_type() {
            Some(ct) if is_form_urlencoded(ct) => {
                for (key, value) in form_urlencoded::parse(req.body()) {
                    pairs.push((key.into_owned(), Value::Text(value.into_owned())));
                }
            }
            Some(ct) if is_multipart(ct) => {
                pairs.extend(multipart::parse(ct, req.body())?);
            }
            _ => {}
        }

        for (name, value) in captures {
            pairs.push((name.clone(), Value::Text(value.clone())));
        }

        let mut root = Params::new();
        for (key, value) in pairs {
            insert_pair(&mut root, &key, value)?;
        }
        Ok(root)
    }
}

fn is_form_urlencoded(content_type: &str) -> bool {
    media_type(content_type).eq_ignore_ascii_case("application/x-www-form-urlencoded")
}

fn is_multipart(content_type: &str) -> bool {
    media_type(content_type).eq_ignore_ascii_case("multipart/form-data")
}

/// The media type without parameters: `text/html; charset=utf-8` → `text/html`.
fn media_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(mt, _)| mt)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    fn get(path: &str, query: &str) -> Request {
        Request::new(Method::Get, path, query, Vec::new(), Bytes::new())
    }

    fn form_post(query: &str, body: &str) -> Request {
        Request::new(
            Method::Post,
            "/submit",
            query,
            vec![(
                "content-type".to_owned(),
                "application/x-www-form-urlencoded".to_owned(),
            )],
            body.to_owned(),
        )
    }

    fn captures(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn query_only_get_binds_flat_scalars() {
        let params = Binder::new().bind(&get("/search", "q=sinatra"), &[]).unwrap();
        assert_eq!(params.text("q"), Some("sinatra"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn query_pairs_are_percent_decoded() {
        let params = Binder::new()
            .bind(&get("/search", "q=web+framework&lang=pt%2DBR"), &[])
            .unwrap();
        assert_eq!(params.text("q"), Some("web framework"));
        assert_eq!(params.text("lang"), Some("pt-BR"));
    }

    #[test]
    fn array_keys_accumulate_in_encounter_order() {
        let params = Binder::new()
            .bind(&get("/pick", "colors[]=red&colors[]=blue"), &[])
            .unwrap();
        let colors = params.list("colors").expect("colors should be a list");
        assert_eq!(
            colors,
            &[Value::Text("red".to_owned()), Value::Text("blue".to_owned())]
        );
    }

    #[test]
    fn bracket_keys_build_nested_maps() {
        let params = Binder::new()
            .bind(&get("/signup", "user[name]=Bob&user[email]=b%40x.com"), &[])
            .unwrap();
        let user = params.map("user").expect("user should be a map");
        assert_eq!(user.text("name"), Some("Bob"));
        assert_eq!(user.text("email"), Some("b@x.com"));
    }

    #[test]
    fn nesting_goes_arbitrarily_deep() {
        let params = Binder::new()
            .bind(&get("/signup", "user[address][city]=Lisbon"), &[])
            .unwrap();
        let city = params
            .map("user")
            .and_then(|u| u.map("address"))
            .and_then(|a| a.text("city"));
        assert_eq!(city, Some("Lisbon"));
    }

    #[test]
    fn capture_overwrites_same_named_query_scalar() {
        let params = Binder::new()
            .bind(&get("/hello/Alice", "name=Bob"), &captures(&[("name", "Alice")]))
            .unwrap();
        assert_eq!(params.text("name"), Some("Alice"));
    }

    #[test]
    fn body_overwrites_query_and_capture_overwrites_body() {
        let req = form_post("who=query", "who=body");
        let params = Binder::new().bind(&req, &[]).unwrap();
        assert_eq!(params.text("who"), Some("body"));

        let params = Binder::new()
            .bind(&req, &captures(&[("who", "route")]))
            .unwrap();
        assert_eq!(params.text("who"), Some("route"));
    }

    #[test]
    fn repeated_scalar_key_keeps_the_last_value() {
        let params = Binder::new().bind(&get("/x", "a=1&a=2"), &[]).unwrap();
        assert_eq!(params.text("a"), Some("2"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn repeated_nested_scalar_keeps_the_last_value() {
        let params = Binder::new()
            .bind(&get("/x", "a[x]=1&a[x]=2&a[y]=3"), &[])
            .unwrap();
        let a = params.map("a").unwrap();
        assert_eq!(a.text("x"), Some("2"));
        assert_eq!(a.text("y"), Some("3"));
    }

    #[test]
    fn arrays_accumulate_across_query_and_body() {
        let req = form_post("colors[]=red", "colors[]=blue");
        let params = Binder::new().bind(&req, &[]).unwrap();
        let colors = params.list("colors").unwrap();
        assert_eq!(
            colors,
            &[Value::Text("red".to_owned()), Value::Text("blue".to_owned())]
        );
    }

    #[test]
    fn array_and_map_for_one_base_key_is_a_conflict() {
        let err = Binder::new()
            .bind(&get("/x", "c[]=red&c[kind]=warm"), &[])
            .unwrap_err();
        assert!(matches!(err, Error::BinderConflict { key } if key == "c"));
    }

    #[test]
    fn scalar_then_container_is_a_conflict() {
        let err = Binder::new().bind(&get("/x", "c=red&c[kind]=warm"), &[]).unwrap_err();
        assert!(matches!(err, Error::BinderConflict { .. }));

        let err = Binder::new().bind(&get("/x", "c[]=red&c=warm"), &[]).unwrap_err();
        assert!(matches!(err, Error::BinderConflict { .. }));
    }

    #[test]
    fn mid_key_append_builds_a_sequence_of_maps() {
        let params = Binder::new()
            .bind(&get("/x", "points[][x]=1&points[][y]=2"), &[])
            .unwrap();
        let points = params.list("points").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].as_map().and_then(|m| m.text("x")), Some("1"));
        assert_eq!(points[1].as_map().and_then(|m| m.text("y")), Some("2"));
    }

    #[test]
    fn degenerate_bracket_keys_stay_literal() {
        let params = Binder::new()
            .bind(&get("/x", "a%5Bb=1&%5Bc%5D=2"), &[])
            .unwrap();
        assert_eq!(params.text("a[b"), Some("1"));
        assert_eq!(params.text("[c]"), Some("2"));
    }

    #[test]
    fn bracket_expansion_is_idempotent_on_flat_output() {
        let params = Binder::new()
            .bind(&get("/x", "q=one&lang=two"), &[])
            .unwrap();

        // Re-inserting the already-expanded entries changes nothing.
        let mut again = Params::new();
        for (key, value) in params.iter() {
            insert_pair(&mut again, key, value.clone()).unwrap();
        }
        assert_eq!(again, params);
    }

    #[test]
    fn body_over_the_limit_fails_before_binding() {
        let req = form_post("", "a=1234567890");
        let err = Binder::with_body_limit(4).bind(&req, &[]).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { limit: 4 }));
    }

    #[test]
    fn body_exactly_at_the_limit_binds() {
        let body = "a=12";
        let req = form_post("", body);
        let params = Binder::with_body_limit(body.len()).bind(&req, &[]).unwrap();
        assert_eq!(params.text("a"), Some("12"));
    }

    #[test]
    fn multipart_file_field_binds_as_uploaded_file() {
        let body = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"caption\"\r\n",
            "\r\n",
            "on holiday\r\n",
            "--B\r\n",
            "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
            "Content-Type: image/png\r\n",
            "\r\n",
            "PNGDATA\r\n",
            "--B--\r\n",
        );
        let req = Request::new(
            Method::Post,
            "/upload",
            "",
            vec![(
                "content-type".to_owned(),
                "multipart/form-data; boundary=B".to_owned(),
            )],
            body.to_owned(),
        );

        let params = Binder::new().bind(&req, &[]).unwrap();
        assert_eq!(params.text("caption"), Some("on holiday"));

        let avatar = params.file("avatar").expect("avatar should be a file");
        assert_eq!(avatar.field_name(), "avatar");
        assert_eq!(avatar.filename(), "me.png");
        assert_eq!(avatar.data(), b"PNGDATA");
        assert!(params.get("avatar").unwrap().as_text().is_none());
    }

    #[test]
    fn unparseable_multipart_boundary_is_malformed_body() {
        let req = Request::new(
            Method::Post,
            "/upload",
            "",
            vec![("content-type".to_owned(), "multipart/form-data; boundary=B".to_owned())],
            "no boundary here",
        );
        let err = Binder::new().bind(&req, &[]).unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[test]
    fn missing_key_is_simply_absent() {
        let params = Binder::new().bind(&get("/x", "a=1"), &[]).unwrap();
        assert!(params.get("missing").is_none());
        assert_eq!(params.text("missing"), None);
    }

    #[test]
    fn key_parsing_grammar() {
        assert_eq!(parse_key("plain"), None);
        assert_eq!(
            parse_key("user[name]"),
            Some(("user", vec![KeyStep::Key("name")]))
        );
        assert_eq!(parse_key("colors[]"), Some(("colors", vec![KeyStep::Append])));
        assert_eq!(
            parse_key("user[address][city]"),
            Some(("user", vec![KeyStep::Key("address"), KeyStep::Key("city")]))
        );
        // Degenerate shapes fall back to literal keys.
        assert_eq!(parse_key("[oops]"), None);
        assert_eq!(parse_key("a[b"), None);
        assert_eq!(parse_key("a[b]c"), None);
    }
}
