//! `multipart/form-data` body parsing.
//!
//! Produces a flat list of named parts in encounter order. A part whose
//! `Content-Disposition` carries a `filename` becomes an
//! [`UploadedFile`](crate::UploadedFile); any other part is a text field and
//! must be valid UTF-8.
//!
//! Framing follows RFC 2046 §5.1: parts are separated by
//! `CRLF--<boundary>`, the final separator carries a trailing `--`, and
//! anything before the first boundary (the preamble) or after the closing
//! one (the epilogue) is ignored. Any framing violation is
//! [`Error::MalformedBody`](crate::Error::MalformedBody).

use bytes::Bytes;

use crate::error::Error;
use crate::params::{UploadedFile, Value};

const OCTET_STREAM: &str = "application/octet-stream";

/// Parses a multipart body into `(field_name, value)` pairs.
///
/// `content_type` is the full `Content-Type` header value; the boundary is
/// read from its `boundary` parameter.
pub(crate) fn parse(content_type: &str, body: &[u8]) -> Result<Vec<(String, Value)>, Error> {
    let boundary = boundary_param(content_type)
        .ok_or_else(|| Error::malformed_body("missing multipart boundary parameter"))?;
    if boundary.is_empty() {
        return Err(Error::malformed_body("empty multipart boundary"));
    }

    let delimiter = format!("--{boundary}").into_bytes();
    let separator = {
        let mut sep = b"\r\n".to_vec();
        sep.extend_from_slice(&delimiter);
        sep
    };

    // Skip the preamble up to and including the opening delimiter.
    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| Error::malformed_body("opening boundary not found"))?
        + delimiter.len();

    let mut parts = Vec::new();
    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            // Closing delimiter; the epilogue, if any, is ignored.
            return Ok(parts);
        }
        if !rest.starts_with(b"\r\n") {
            return Err(Error::malformed_body("unexpected bytes after boundary"));
        }
        pos += 2;

        let end = find(body, &separator, pos)
            .ok_or_else(|| Error::malformed_body("missing closing boundary"))?;
        parts.push(parse_part(&body[pos..end])?);
        pos = end + separator.len();
    }
}

/// Parses one part: headers, blank line, raw data.
fn parse_part(part: &[u8]) -> Result<(String, Value), Error> {
    let header_end = find(part, b"\r\n\r\n", 0)
        .ok_or_else(|| Error::malformed_body("part missing blank line after headers"))?;
    let data = &part[header_end + 4..];

    let headers = std::str::from_utf8(&part[..header_end])
        .map_err(|_| Error::malformed_body("part headers are not valid UTF-8"))?;

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        let (header, value) = line
            .split_once(':')
            .ok_or_else(|| Error::malformed_body("malformed part header line"))?;
        let value = value.trim();
        if header.eq_ignore_ascii_case("content-disposition") {
            (name, filename) = parse_disposition(value)?;
        } else if header.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_owned());
        }
    }

    let name = name.ok_or_else(|| Error::malformed_body("part missing a field name"))?;

    // A filename marks a file part, even when the file itself is empty.
    if let Some(filename) = filename {
        let file = UploadedFile {
            field_name: name.clone(),
            filename,
            content_type: content_type.unwrap_or_else(|| OCTET_STREAM.to_owned()),
            data: Bytes::copy_from_slice(data),
        };
        return Ok((name, Value::File(file)));
    }

    let text = String::from_utf8(data.to_vec())
        .map_err(|_| Error::malformed_body("text field is not valid UTF-8"))?;
    Ok((name, Value::Text(text)))
}

/// Extracts `name` and `filename` from a `Content-Disposition` value.
///
/// Quoted parameter values are unquoted; escaped characters inside quotes
/// are passed through as-is.
fn parse_disposition(value: &str) -> Result<(Option<String>, Option<String>), Error> {
    let mut pieces = value.split(';').map(str::trim);
    let kind = pieces.next().unwrap_or_default();
    if !kind.eq_ignore_ascii_case("form-data") {
        return Err(Error::malformed_body(format!(
            "unsupported content disposition `{kind}`"
        )));
    }

    let mut name = None;
    let mut filename = None;
    for piece in pieces {
        if let Some((key, value)) = piece.split_once('=') {
            let value = value.trim().trim_matches('"').to_owned();
            match key.trim() {
                "name" => name = Some(value),
                "filename" => filename = Some(value),
                _ => {}
            }
        }
    }
    Ok((name, filename))
}

/// The `boundary` parameter of a `multipart/form-data` content type.
fn boundary_param(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|piece| piece.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
}

/// First occurrence of `needle` in `haystack` at or after `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
