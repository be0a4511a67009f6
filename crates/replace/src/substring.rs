//! Regex substitution inside string fields (`path%pattern%`).

use regex::Regex;
use remap_core::{Node, Scalar};

use crate::error::{ReplaceError, Result};

/// String form of a replacement value. Only strings and numbers qualify.
pub fn replacement_text(value: &Node) -> Result<String> {
    match value {
        Node::Scalar(Scalar::Str(s)) => Ok(s.clone()),
        Node::Scalar(s) if s.is_numeric() => Ok(s.render()),
        other => Err(ReplaceError::PatternReplacementInvalid { actual: other.kind_name() }),
    }
}

/// Replace every match of `pattern` in `current` with `replacement`.
///
/// `current` must be a string or a sequence of strings; a sequence keeps its
/// order and length. `$name` references in `replacement` expand capture groups.
pub fn substitute(current: &Node, pattern: &Regex, replacement: &str, at: &str) -> Result<Node> {
    match current {
        Node::Scalar(Scalar::Str(s)) => Ok(Node::string(pattern.replace_all(s, replacement))),
        Node::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Node::Scalar(Scalar::Str(s)) => Ok(Node::string(pattern.replace_all(s, replacement))),
                other => Err(ReplaceError::PatternTargetInvalid { at: at.to_string(), actual: other.kind_name() }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Node::Sequence),
        other => Err(ReplaceError::PatternTargetInvalid { at: at.to_string(), actual: other.kind_name() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(p: &str) -> Regex {
        Regex::new(p).unwrap()
    }

    #[test]
    fn replaces_every_match() {
        let out = substitute(&Node::string("foofoo"), &re("foo"), "bar", "x").unwrap();
        assert_eq!(out, Node::string("barbar"));
    }

    #[test]
    fn sequence_elements_are_rewritten_in_place() {
        let cur = Node::Sequence(vec![Node::string("10.0.0.1:80"), Node::string("db"), Node::string("10.0.0.2")]);
        let out = substitute(&cur, &re(r"10\.0\.0\.\d+"), "192.168.1.1", "x").unwrap();
        assert_eq!(
            out,
            Node::Sequence(vec![Node::string("192.168.1.1:80"), Node::string("db"), Node::string("192.168.1.1")])
        );
    }

    #[test]
    fn non_string_targets_fail() {
        let err = substitute(&Node::from(3), &re("3"), "4", "spec.replicas").unwrap_err();
        assert!(matches!(err, ReplaceError::PatternTargetInvalid { actual: "number", .. }), "{err}");
        let mixed = Node::Sequence(vec![Node::string("a"), Node::from(true)]);
        assert!(matches!(substitute(&mixed, &re("a"), "b", "x"), Err(ReplaceError::PatternTargetInvalid { .. })));
        assert!(matches!(substitute(&Node::map(), &re("a"), "b", "x"), Err(ReplaceError::PatternTargetInvalid { .. })));
    }

    #[test]
    fn numbers_stringify_as_replacements() {
        assert_eq!(replacement_text(&Node::from(8080)).unwrap(), "8080");
        assert_eq!(replacement_text(&Node::string("v2")).unwrap(), "v2");
        let err = replacement_text(&Node::from(true)).unwrap_err();
        assert!(matches!(err, ReplaceError::PatternReplacementInvalid { actual: "bool" }));
        assert!(replacement_text(&Node::map()).is_err());
    }

    #[test]
    fn capture_groups_expand() {
        let out = substitute(&Node::string("image:1.0"), &re(r"(?P<repo>\w+):.*"), "${repo}:2.0", "x").unwrap();
        assert_eq!(out, Node::string("image:2.0"));
    }
}
