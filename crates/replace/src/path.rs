//! Field path expressions.
//!
//! Grammar, informally:
//!
//! ```text
//! path      := segment ("." segment)* ["%" pattern "%"]
//! segment   := key | field "[" key "=" value "]"
//! ```
//!
//! Dots inside `[...]` do not split, so `spec.ip[addr=10.0.0.1].port` keeps
//! the address intact. A trailing `%pattern%` turns the write into a regex
//! substitution on the addressed value.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use smallvec::SmallVec;

use crate::error::{ReplaceError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Map key, or a sequence index when the container turns out to be a sequence.
    Key(String),
    /// `field[key=value]`: the element of sequence `field` whose `key` equals `value`.
    Predicate { field: String, key: String, value: String },
}

impl Segment {
    fn parse(token: &str) -> Segment {
        match parse_predicate(token) {
            Some((field, key, value)) => Segment::Predicate {
                field: field.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            },
            None => Segment::Key(token.to_string()),
        }
    }

    /// Numeric reading of a `Key` segment.
    pub fn index(&self) -> Option<i64> {
        match self {
            Segment::Key(k) => k.parse::<i64>().ok(),
            Segment::Predicate { .. } => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Predicate { field, key, value } => write!(f, "{}[{}={}]", field, key, value),
        }
    }
}

/// Compiled `%pattern%` suffix.
#[derive(Debug, Clone)]
pub struct SubstringPattern {
    source: String,
    regex: Regex,
}

impl SubstringPattern {
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(source)
            .map_err(|e| ReplaceError::InvalidPattern { pattern: source.to_string(), source: e })?;
        Ok(Self { source: source.to_string(), regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for SubstringPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A parsed field path. The substring pattern, if any, belongs to the last segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    segments: SmallVec<[Segment; 8]>,
    pattern: Option<SubstringPattern>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let (rest, pattern) = match split_substring_pattern(path) {
            Some((rest, pattern)) => (rest, Some(SubstringPattern::new(pattern)?)),
            None => (path, None),
        };
        let segments = if rest.is_empty() {
            SmallVec::new()
        } else {
            split_outside_brackets(rest).into_iter().map(Segment::parse).collect()
        };
        Ok(Self { segments, pattern })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn pattern(&self) -> Option<&SubstringPattern> {
        self.pattern.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path without the pattern suffix, used in error messages.
    pub fn location(&self) -> String {
        join(&self.segments)
    }
}

impl FromStr for FieldPath {
    type Err = ReplaceError;

    fn from_str(s: &str) -> Result<Self> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())?;
        if let Some(p) = &self.pattern {
            write!(f, "%{}%", p.as_str())?;
        }
        Ok(())
    }
}

pub(crate) fn join(segments: &[Segment]) -> String {
    segments.iter().map(Segment::to_string).collect::<Vec<_>>().join(".")
}

/// `<rest>%<pattern>%` at the end of the path. The pattern starts after the
/// last `%` before the closing one and may not contain whitespace.
fn split_substring_pattern(path: &str) -> Option<(&str, &str)> {
    let body = path.strip_suffix('%')?;
    let open = body.rfind('%')?;
    let (rest, pattern) = (&body[..open], &body[open + 1..]);
    if rest.is_empty() || pattern.is_empty() || pattern.chars().any(char::is_whitespace) {
        return None;
    }
    Some((rest, pattern))
}

/// Split on `.` except inside `[...]`.
fn split_outside_brackets(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                out.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&path[start..]);
    out
}

/// `field[key=value]`, all three parts non-empty and free of whitespace.
fn parse_predicate(token: &str) -> Option<(&str, &str, &str)> {
    let inner = token.strip_suffix(']')?;
    let open = inner.find('[')?;
    let (field, filter) = (&inner[..open], &inner[open + 1..]);
    let (key, value) = filter.split_once('=')?;
    let valid = |s: &str| !s.is_empty() && !s.chars().any(char::is_whitespace);
    if valid(field) && valid(key) && valid(value) {
        Some((field, key, value))
    } else {
        None
    }
}
