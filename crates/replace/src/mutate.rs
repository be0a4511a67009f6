//! Walking and writing a resource tree along a [`FieldPath`].

use regex::Regex;
use remap_core::{Node, Scalar};
use tracing::warn;

use crate::error::{ReplaceError, Result};
use crate::path::{join, FieldPath, Segment};
use crate::substring::{replacement_text, substitute};

/// Write `value` at `path` inside `root`.
///
/// Missing map keys are created as empty maps on the way down, except for
/// predicate-addressed sequences, which must already exist. A predicate that
/// matches no element leaves the tree untouched. With a substring pattern the
/// addressed value is rewritten by regex instead of overwritten.
pub fn write(root: &mut Node, path: &FieldPath, value: &Node) -> Result<()> {
    if path.is_empty() {
        return Ok(());
    }
    let substitution = match path.pattern() {
        Some(p) => Some((p.regex(), replacement_text(value)?)),
        None => None,
    };
    Writer { segments: path.segments(), value, substitution }.step(root, 0)
}

struct Writer<'a> {
    segments: &'a [Segment],
    value: &'a Node,
    substitution: Option<(&'a Regex, String)>,
}

impl Writer<'_> {
    fn step(&self, node: &mut Node, depth: usize) -> Result<()> {
        let seg = &self.segments[depth];
        let at = join(&self.segments[..=depth]);
        let kind = node.kind_name();
        match (node, seg) {
            (Node::Map(map), Segment::Key(k)) => {
                let leaf = depth + 1 == self.segments.len();
                if leaf && self.substitution.is_some() && !map.contains_key(k) {
                    // nothing to rewrite; leave the tree as it was
                    return Err(ReplaceError::PatternTargetInvalid { at, actual: "missing field" });
                }
                let child = map.entry(k.clone()).or_insert_with(Node::map);
                if child.is_null() {
                    return Err(ReplaceError::mismatch(&at, "non-null value", child));
                }
                self.descend(child, depth, &at)
            }
            (Node::Map(map), Segment::Predicate { field, key, value }) => {
                let child = map.get_mut(field).ok_or_else(|| ReplaceError::FieldNotFound {
                    field: join_field(&self.segments[..depth], field),
                })?;
                let items = match child {
                    Node::Sequence(items) => items,
                    other => return Err(ReplaceError::mismatch(&at, "sequence", other)),
                };
                match find_element(items, key, value, &at)? {
                    Some(i) => self.descend(&mut items[i], depth, &at),
                    None => {
                        warn!(path = %at, "no sequence element matches predicate; skipping");
                        Ok(())
                    }
                }
            }
            (Node::Sequence(items), Segment::Key(k)) => {
                let index = seg.index().ok_or_else(|| ReplaceError::InvalidIndex { segment: k.clone() })?;
                let len = items.len();
                let elem = usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or(ReplaceError::IndexOutOfBound { index, len })?;
                self.descend(elem, depth, &at)
            }
            (Node::Sequence(_), Segment::Predicate { .. }) => {
                Err(ReplaceError::TypeMismatch { at, expected: "map", actual: kind })
            }
            (Node::Scalar(_), _) => Err(ReplaceError::TypeMismatch { at, expected: "map or sequence", actual: kind }),
        }
    }

    /// Either finish at `node` (last segment) or keep walking below it.
    fn descend(&self, node: &mut Node, depth: usize, at: &str) -> Result<()> {
        if depth + 1 < self.segments.len() {
            return self.step(node, depth + 1);
        }
        let new = match &self.substitution {
            Some((regex, text)) => substitute(node, regex, text, at)?,
            None => self.value.clone(),
        };
        *node = new;
        Ok(())
    }
}

/// Read the node at `path`. Every segment must resolve; an empty path yields `root`.
pub fn lookup<'n>(root: &'n Node, path: &FieldPath) -> Result<&'n Node> {
    let segments = path.segments();
    let mut cur = root;
    for (depth, seg) in segments.iter().enumerate() {
        let at = join(&segments[..=depth]);
        cur = match (cur, seg) {
            (Node::Map(map), Segment::Key(k)) => {
                map.get(k).ok_or_else(|| ReplaceError::FieldNotFound { field: at.clone() })?
            }
            (Node::Map(map), Segment::Predicate { field, key, value }) => {
                let child = map.get(field).ok_or_else(|| ReplaceError::FieldNotFound {
                    field: join_field(&segments[..depth], field),
                })?;
                let items = match child {
                    Node::Sequence(items) => items,
                    other => return Err(ReplaceError::mismatch(&at, "sequence", other)),
                };
                let i = find_element(items, key, value, &at)?
                    .ok_or_else(|| ReplaceError::FieldNotFound { field: at.clone() })?;
                &items[i]
            }
            (Node::Sequence(items), Segment::Key(k)) => {
                let index = seg.index().ok_or_else(|| ReplaceError::InvalidIndex { segment: k.clone() })?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .ok_or(ReplaceError::IndexOutOfBound { index, len: items.len() })?
            }
            (other @ Node::Sequence(_), Segment::Predicate { .. }) => {
                return Err(ReplaceError::mismatch(&at, "map", other));
            }
            (other @ Node::Scalar(_), _) => return Err(ReplaceError::mismatch(&at, "map or sequence", other)),
        };
    }
    Ok(cur)
}

/// Position of the first map element whose `key` renders as `value`.
/// Any non-map element seen before a match is a type error.
fn find_element(items: &[Node], key: &str, value: &str, at: &str) -> Result<Option<usize>> {
    for (i, item) in items.iter().enumerate() {
        let map = match item {
            Node::Map(map) => map,
            other => return Err(ReplaceError::mismatch(at, "map", other)),
        };
        let hit = map
            .get(key)
            .and_then(Node::as_scalar)
            .map(Scalar::render)
            .is_some_and(|actual| actual == value);
        if hit {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn join_field(prefix: &[Segment], field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", join(prefix), field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(v: serde_json::Value) -> Node {
        Node::from(v)
    }

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    #[test]
    fn auto_vivifies_missing_maps() {
        let mut root = node(json!({ "metadata": { "name": "x" } }));
        write(&mut root, &path("metadata.labels.owner"), &Node::string("abc")).unwrap();
        assert_eq!(root, node(json!({ "metadata": { "name": "x", "labels": { "owner": "abc" } } })));
    }

    #[test]
    fn index_bounds_are_checked() {
        let mut root = node(json!({ "items": ["a", "b", "c"] }));
        let err = write(&mut root, &path("items.5"), &Node::string("z")).unwrap_err();
        assert!(matches!(err, ReplaceError::IndexOutOfBound { index: 5, len: 3 }), "{err}");
        let err = write(&mut root, &path("items.3"), &Node::string("z")).unwrap_err();
        assert!(matches!(err, ReplaceError::IndexOutOfBound { index: 3, len: 3 }), "{err}");
        let err = write(&mut root, &path("items.-1"), &Node::string("z")).unwrap_err();
        assert!(matches!(err, ReplaceError::IndexOutOfBound { index: -1, .. }), "{err}");
        write(&mut root, &path("items.2"), &Node::string("z")).unwrap();
        assert_eq!(root, node(json!({ "items": ["a", "b", "z"] })));
    }

    #[test]
    fn non_numeric_index_on_sequence() {
        let mut root = node(json!({ "items": ["a"] }));
        let err = write(&mut root, &path("items.first"), &Node::string("z")).unwrap_err();
        assert!(matches!(err, ReplaceError::InvalidIndex { .. }), "{err}");
    }

    #[test]
    fn predicate_targets_one_element() {
        let mut root = node(json!({ "spec": { "containers": [
            { "name": "sidecar", "image": "envoy:1" },
            { "name": "nginx", "image": "nginx:1.0" }
        ]}}));
        write(&mut root, &path("spec.containers[name=nginx].image"), &Node::string("nginx:1.2")).unwrap();
        assert_eq!(root, node(json!({ "spec": { "containers": [
            { "name": "sidecar", "image": "envoy:1" },
            { "name": "nginx", "image": "nginx:1.2" }
        ]}})));
    }

    #[test]
    fn final_predicate_replaces_whole_element() {
        let mut root = node(json!({ "ports": [ { "port": 80, "name": "http" }, { "port": 443 } ] }));
        write(&mut root, &path("ports[port=80]"), &node(json!({ "port": 8080 }))).unwrap();
        assert_eq!(root, node(json!({ "ports": [ { "port": 8080 }, { "port": 443 } ] })));
    }

    #[test]
    fn unmatched_predicate_is_a_no_op() {
        let before = node(json!({ "spec": { "containers": [ { "name": "a" } ] } }));
        let mut root = before.clone();
        write(&mut root, &path("spec.containers[name=zzz].image"), &Node::string("x")).unwrap();
        write(&mut root, &path("spec.containers[name=zzz]"), &Node::string("x")).unwrap();
        assert_eq!(root, before);
    }

    #[test]
    fn predicate_container_is_never_vivified() {
        let mut root = node(json!({ "spec": {} }));
        let err = write(&mut root, &path("spec.containers[name=a].image"), &Node::string("x")).unwrap_err();
        assert!(matches!(err, ReplaceError::FieldNotFound { ref field } if field == "spec.containers"), "{err}");
        let mut root = node(json!({ "spec": { "containers": "nope" } }));
        let err = write(&mut root, &path("spec.containers[name=a].image"), &Node::string("x")).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { expected: "sequence", .. }), "{err}");
        let mut root = node(json!({ "spec": { "containers": ["plain"] } }));
        let err = write(&mut root, &path("spec.containers[name=a].image"), &Node::string("x")).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { expected: "map", actual: "string", .. }), "{err}");
    }

    #[test]
    fn scalars_and_nulls_are_not_containers() {
        let mut root = node(json!({ "a": "leaf", "n": null }));
        let err = write(&mut root, &path("a.b"), &Node::string("x")).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { actual: "string", .. }), "{err}");
        let err = write(&mut root, &path("n.b"), &Node::string("x")).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { actual: "null", .. }), "{err}");
        let err = write(&mut root, &path("n"), &Node::string("x")).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { actual: "null", .. }), "{err}");
    }

    #[test]
    fn empty_path_does_nothing() {
        let before = node(json!({ "a": 1 }));
        let mut root = before.clone();
        write(&mut root, &path(""), &Node::string("x")).unwrap();
        assert_eq!(root, before);
    }

    #[test]
    fn pattern_rewrites_in_place() {
        let mut root = node(json!({ "spec": { "url": "http://foofoo", "hosts": ["foo.a", "b"] } }));
        write(&mut root, &path("spec.url%foo%"), &Node::string("bar")).unwrap();
        write(&mut root, &path("spec.hosts%foo%"), &Node::string("bar")).unwrap();
        assert_eq!(root, node(json!({ "spec": { "url": "http://barbar", "hosts": ["bar.a", "b"] } })));
    }

    #[test]
    fn pattern_on_indexed_element() {
        let mut root = node(json!({ "args": ["--port=80", "--v=2"] }));
        write(&mut root, &path(r"args.0%\d+%"), &Node::from(8080)).unwrap();
        assert_eq!(root, node(json!({ "args": ["--port=8080", "--v=2"] })));
    }

    #[test]
    fn pattern_on_missing_field_fails() {
        let mut root = node(json!({ "spec": {} }));
        let err = write(&mut root, &path("spec.url%foo%"), &Node::string("bar")).unwrap_err();
        assert!(matches!(err, ReplaceError::PatternTargetInvalid { actual: "missing field", .. }), "{err}");
        assert_eq!(root, node(json!({ "spec": {} })));
        let mut root = node(json!({ "spec": { "url": {} } }));
        let err = write(&mut root, &path("spec.url%foo%"), &Node::string("bar")).unwrap_err();
        assert!(matches!(err, ReplaceError::PatternTargetInvalid { actual: "map", .. }), "{err}");
    }

    #[test]
    fn predicate_below_a_sequence_is_a_type_error() {
        let mut root = node(json!({ "items": [ [ { "k": "v" } ] ] }));
        let err = write(&mut root, &path("items.0.inner[k=v].x"), &Node::string("y")).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { expected: "map", actual: "sequence", .. }), "{err}");
    }

    #[test]
    fn pattern_rejects_bad_replacement_before_touching_tree() {
        let before = node(json!({ "spec": {} }));
        let mut root = before.clone();
        let err = write(&mut root, &path("spec.deep.url%foo%"), &node(json!(["x"]))).unwrap_err();
        assert!(matches!(err, ReplaceError::PatternReplacementInvalid { actual: "sequence" }), "{err}");
        assert_eq!(root, before);
    }

    #[test]
    fn full_overwrite_is_idempotent() {
        let mut once = node(json!({ "spec": { "replicas": 1 } }));
        write(&mut once, &path("spec.replicas"), &Node::from(3)).unwrap();
        let mut twice = once.clone();
        write(&mut twice, &path("spec.replicas"), &Node::from(3)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn lookup_resolves_all_segment_kinds() {
        let root = node(json!({ "spec": { "ports": [ { "name": "http", "port": 80 } ], "hosts": ["a", "b"] } }));
        assert_eq!(lookup(&root, &path("spec.ports[name=http].port")).unwrap(), &Node::from(80));
        assert_eq!(lookup(&root, &path("spec.hosts.1")).unwrap(), &Node::string("b"));
        assert_eq!(lookup(&root, &path("")).unwrap(), &root);
        let err = lookup(&root, &path("spec.missing")).unwrap_err();
        assert!(matches!(err, ReplaceError::FieldNotFound { ref field } if field == "spec.missing"), "{err}");
        let err = lookup(&root, &path("spec.ports[name=grpc].port")).unwrap_err();
        assert!(matches!(err, ReplaceError::FieldNotFound { .. }), "{err}");
        let err = lookup(&root, &path("spec.hosts.9")).unwrap_err();
        assert!(matches!(err, ReplaceError::IndexOutOfBound { index: 9, len: 2 }), "{err}");
    }
}
