/*
    leakroot  -  a memory leak root-cause analyzer
    Copyright (C) 2026  The leakroot Authors

    This program is free software: you can redistribute it and/or modify it
    under the terms of the GNU General Public License as published by the
    Free Software Foundation, either version 3 of the License, or (at your
    option) any later version.

    This program is distributed in the hope that it will be useful, but
    WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License
    for more details.

    You should have received a copy of the GNU General Public License along
    with this program. If not, see <https://www.gnu.org/licenses/>.
*/

// A syntactic lvalue expression rooted at a local or parameter: a name plus
// zero or more field-access or subscript segments.  This is a best-effort
// tokenizer, not a C expression parser -- internals here are deliberately
// not load-bearing for correctness, only the equality/prefix relationships
// the tracker needs are.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    // `.field`
    Field(String),
    // `->field`
    Arrow(String),
    // `[index]`, index text kept verbatim
    Index(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessPath {
    pub head: String,
    pub segments: Vec<Segment>,
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Arrow(name) => write!(f, "->{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl AccessPath {
    pub fn new(head: impl Into<String>) -> AccessPath {
        AccessPath {
            head: head.into(),
            segments: Vec::new(),
        }
    }

    pub fn with_segments(head: impl Into<String>, segments: Vec<Segment>) -> AccessPath {
        AccessPath {
            head: head.into(),
            segments,
        }
    }

    // Parse a raw C expression as written in source into an access path.
    // Returns None for expressions with no identifiable head (pure
    // literals, parenthesized arithmetic, calls, and the like).
    pub fn parse(expr: &str) -> Option<AccessPath> {
        let trimmed = strip_wrapping(expr.trim());
        if trimmed.is_empty() || is_literal(trimmed) {
            return None;
        }

        let bytes = trimmed.as_bytes();
        let mut pos = 0;
        let head = read_ident(bytes, &mut pos)?;
        if head.is_empty() {
            return None;
        }

        let mut segments = Vec::new();
        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    pos += 1;
                    let name = read_ident(bytes, &mut pos)?;
                    segments.push(Segment::Field(name));
                }
                b'-' if pos + 1 < bytes.len() && bytes[pos + 1] == b'>' => {
                    pos += 2;
                    let name = read_ident(bytes, &mut pos)?;
                    segments.push(Segment::Arrow(name));
                }
                b'[' => {
                    let start = pos + 1;
                    let mut depth = 1;
                    let mut end = start;
                    while end < bytes.len() && depth > 0 {
                        match bytes[end] {
                            b'[' => depth += 1,
                            b']' => depth -= 1,
                            _ => {}
                        }
                        if depth > 0 {
                            end += 1;
                        }
                    }
                    if end >= bytes.len() {
                        return None;
                    }
                    let index_text = trimmed[start..end].trim().to_string();
                    segments.push(Segment::Index(index_text));
                    pos = end + 1;
                }
                b' ' | b'\t' => {
                    pos += 1;
                }
                _ => return None,
            }
        }

        Some(AccessPath { head, segments })
    }

    // True if `self` is a strict (non-equal) prefix of `other` -- e.g.
    // `c` is a strict prefix of `c->f`.
    pub fn is_strict_prefix_of(&self, other: &AccessPath) -> bool {
        self.head == other.head
            && self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    // The segments that remain after stripping this path's own length from
    // `other`, assuming `self.is_strict_prefix_of(other)`.
    pub fn suffix_of<'a>(&self, other: &'a AccessPath) -> &'a [Segment] {
        &other.segments[self.segments.len()..]
    }

    // Replace the leading `prefix_len` segments of this path with `new_head`
    // and `new_segments`, keeping the trailing segments.
    pub fn rebased(&self, new_head: &str, new_segments: &[Segment], prefix_len: usize) -> AccessPath {
        let mut segments = new_segments.to_vec();
        segments.extend_from_slice(&self.segments[prefix_len..]);
        AccessPath {
            head: new_head.to_string(),
            segments,
        }
    }
}

fn strip_wrapping(mut expr: &str) -> &str {
    // Strip a single layer of parenthesization and leading address-of /
    // dereference, which are common in source but do not change identity
    // for our purposes.
    while expr.starts_with('(') && expr.ends_with(')') {
        let inner = &expr[1..expr.len() - 1];
        if balanced(inner) {
            expr = inner.trim();
        } else {
            break;
        }
    }
    while let Some(rest) = expr.strip_prefix('&') {
        expr = rest.trim();
    }
    while let Some(rest) = expr.strip_prefix('*') {
        expr = rest.trim();
    }
    expr
}

fn balanced(text: &str) -> bool {
    let mut depth = 0;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn is_literal(expr: &str) -> bool {
    expr == "NULL" || expr == "0" || expr.parse::<i64>().is_ok() || expr.starts_with('"') || expr.starts_with('\'')
}

fn read_ident(bytes: &[u8], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < bytes.len() {
        let c = bytes[*pos];
        if c.is_ascii_alphanumeric() || c == b'_' {
            *pos += 1;
        } else {
            break;
        }
    }
    if *pos == start {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes[start..*pos]).into_owned())
}

// True if `expr`, taken as written in source, is a "pure" variable or
// field/index access with no calls, operators, or literals -- the
// discriminator the tracer uses to decide whether a declaration should be
// reported as an `Alias` event rather than an `Assign` event.
pub fn is_pure_access(expr: &str) -> bool {
    AccessPath::parse(expr).is_some() && !expr.contains('(') && !expr.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_name() {
        let p = AccessPath::parse("t").unwrap();
        assert_eq!(p.head, "t");
        assert!(p.segments.is_empty());
    }

    #[test]
    fn parses_arrow_chain() {
        let p = AccessPath::parse("node->data").unwrap();
        assert_eq!(p.head, "node");
        assert_eq!(p.segments, vec![Segment::Arrow("data".to_string())]);
    }

    #[test]
    fn parses_index() {
        let p = AccessPath::parse("arr[4]").unwrap();
        assert_eq!(p.head, "arr");
        assert_eq!(p.segments, vec![Segment::Index("4".to_string())]);
    }

    #[test]
    fn rejects_calls_and_literals() {
        assert!(AccessPath::parse("malloc(128)").is_none());
        assert!(AccessPath::parse("NULL").is_none());
        assert!(AccessPath::parse("0").is_none());
        assert!(AccessPath::parse("\"x\"").is_none());
    }

    #[test]
    fn strict_prefix_relationship() {
        let c = AccessPath::new("q");
        let cf = AccessPath::parse("q->v").unwrap();
        assert!(c.is_strict_prefix_of(&cf));
        assert!(!cf.is_strict_prefix_of(&c));
        assert!(!c.is_strict_prefix_of(&c));
    }

    #[test]
    fn display_round_trips_shape() {
        let p = AccessPath::parse("q->v").unwrap();
        assert_eq!(p.to_string(), "q->v");
        let p = AccessPath::parse("arr[4]").unwrap();
        assert_eq!(p.to_string(), "arr[4]");
    }

    #[test]
    fn pure_access_discriminator() {
        assert!(is_pure_access("head"));
        assert!(is_pure_access("node->next"));
        assert!(!is_pure_access("malloc(64)"));
        assert!(!is_pure_access("a + b"));
    }
}
