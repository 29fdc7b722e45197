//! Route-pattern grammar and path matching.
//!
//! A pattern is a `/`-separated template where each segment is either a
//! literal (`users`) or a named capture (`:id`). Captures match exactly one
//! non-empty path segment. There are no wildcard tails: segment counts must
//! match exactly.
//!
//! Validation happens once, at registration. Captured values are
//! percent-decoded and owned by the match.

use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Capture(String),
}

/// A parsed, validated route pattern. Immutable once built.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses and validates a pattern string.
    ///
    /// Rejected inputs:
    /// - patterns not starting with `/`
    /// - empty segments (`/foo//bar`, trailing `/`)
    /// - a bare `:` (capture with no name)
    /// - capture names with characters outside `[A-Za-z0-9_]`
    /// - a `:` inside a literal segment (`/foo:bar` mixes both syntaxes)
    /// - duplicate capture names
    pub(crate) fn parse(raw: &str) -> Result<Self, Error> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| Error::malformed_pattern(raw, "must start with `/`"))?;

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for piece in rest.split('/') {
                segments.push(parse_segment(raw, piece)?);
            }
        }

        // Duplicate capture names would make one binding silently clobber
        // the other at dispatch time.
        for (i, seg) in segments.iter().enumerate() {
            if let Segment::Capture(name) = seg {
                let dup = segments[..i].iter().any(|s| s == seg);
                if dup {
                    return Err(Error::malformed_pattern(
                        raw,
                        format!("duplicate capture name `:{name}`"),
                    ));
                }
            }
        }

        Ok(Self { raw: raw.to_owned(), segments })
    }

    /// Matches a request path against this pattern.
    ///
    /// Returns the captured segments in path order, percent-decoded, or
    /// `None` if the path does not match.
    pub(crate) fn match_path(&self, path: &str) -> Option<Vec<(String, String)>> {
        let pieces = split_path(path);
        if pieces.len() != self.segments.len() {
            return None;
        }

        let mut captures = Vec::new();
        for (seg, piece) in self.segments.iter().zip(&pieces) {
            match seg {
                Segment::Literal(lit) => {
                    if lit != piece {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    if piece.is_empty() {
                        return None;
                    }
                    captures.push((name.clone(), decode_segment(piece)));
                }
            }
        }
        Some(captures)
    }

    /// True if every path this pattern could match is already matched by
    /// `earlier`. Used to warn about unreachable registrations.
    pub(crate) fn is_shadowed_by(&self, earlier: &Pattern) -> bool {
        if earlier.segments.len() != self.segments.len() {
            return false;
        }
        self.segments.iter().zip(&earlier.segments).all(|(ours, theirs)| {
            match (theirs, ours) {
                (Segment::Capture(_), _) => true,
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Literal(_), Segment::Capture(_)) => false,
            }
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(raw: &str, piece: &str) -> Result<Segment, Error> {
    if piece.is_empty() {
        return Err(Error::malformed_pattern(raw, "empty path segment"));
    }

    if let Some(name) = piece.strip_prefix(':') {
        if name.is_empty() {
            return Err(Error::malformed_pattern(raw, "empty capture name"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::malformed_pattern(
                raw,
                format!("invalid capture name `:{name}`"),
            ));
        }
        return Ok(Segment::Capture(name.to_owned()));
    }

    if piece.contains(':') {
        return Err(Error::malformed_pattern(
            raw,
            format!("segment `{piece}` mixes literal and capture syntax"),
        ));
    }

    Ok(Segment::Literal(piece.to_owned()))
}

/// Splits a request path into segments. `/` yields no segments; a trailing
/// slash yields a final empty segment, which matches nothing.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}

/// Percent-decodes a captured path segment. Invalid escapes are passed
/// through verbatim rather than rejected; the segment already matched.
fn decode_segment(piece: &str) -> String {
    urlencoding::decode(piece)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| piece.to_owned())
}
