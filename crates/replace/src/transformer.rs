//! Rule orchestration: resolve each rule's value, then write it into every target.

use std::time::Instant;

use metrics::{counter, histogram};
use remap_core::{parse_stream, to_yaml_stream, Document, Node, ObjectRef, Selector};
use tracing::{debug, info, warn};

use crate::config::{ReplacementSpec, TransformerConfig};
use crate::error::{ReplaceError, Result};
use crate::mutate::{lookup, write};
use crate::path::FieldPath;

const DEFAULT_SOURCE_FIELD: &str = "metadata.name";

#[derive(Debug, Clone)]
pub enum Source {
    Literal(Node),
    Field { selector: ObjectRef, path: FieldPath },
}

#[derive(Debug, Clone)]
pub struct Target {
    pub selector: ObjectRef,
    pub paths: Vec<FieldPath>,
}

/// One validated replacement with its paths already parsed.
#[derive(Debug, Clone)]
pub struct Rule {
    pub source: Source,
    pub target: Target,
}

impl Rule {
    fn compile(spec: &ReplacementSpec) -> Result<Self> {
        let missing = |what: &str| ReplaceError::BadConfiguration(format!("{} must be specified", what));
        let src = spec.source.as_ref().ok_or_else(|| missing("source"))?;
        let tgt = spec.target.as_ref().ok_or_else(|| missing("target"))?;

        let source = match (&src.obj_ref, src.literal()) {
            (Some(selector), None) => {
                let path = FieldPath::parse(src.field_ref.as_deref().unwrap_or(DEFAULT_SOURCE_FIELD))?;
                if path.pattern().is_some() {
                    return Err(ReplaceError::BadConfiguration(format!(
                        "source fieldref {} cannot carry a substring pattern",
                        path
                    )));
                }
                Source::Field { selector: selector.clone(), path }
            }
            (None, Some(value)) => Source::Literal(value.clone()),
            (Some(_), Some(_)) => {
                return Err(ReplaceError::BadConfiguration("only one of objref and value is allowed".into()))
            }
            (None, None) => return Err(ReplaceError::BadConfiguration("one of objref or value must be set".into())),
        };

        let selector = tgt.obj_ref.clone().ok_or_else(|| missing("target objref"))?;
        let paths = tgt.field_refs.iter().map(|p| FieldPath::parse(p)).collect::<Result<Vec<_>>>()?;
        Ok(Self { source, target: Target { selector, paths } })
    }

    /// The value this rule writes. A field source must match exactly one document.
    pub fn resolve_source(&self, docs: &[Document]) -> Result<Node> {
        match &self.source {
            Source::Literal(v) => Ok(v.clone()),
            Source::Field { selector, path } => {
                let found = Selector::from_ref(selector).select(docs);
                let doc = match found.as_slice() {
                    [doc] => *doc,
                    [] => return Err(ReplaceError::SourceNotFound { selector: selector.clone() }),
                    many => {
                        return Err(ReplaceError::AmbiguousSource { selector: selector.clone(), count: many.len() })
                    }
                };
                debug!(source = %doc.id(), field = %path, "resolved replacement source");
                Ok(lookup(&doc.root, path)?.clone())
            }
        }
    }

    /// Apply to every matching target. Returns how many documents were targeted.
    pub fn apply(&self, docs: &mut [Document]) -> Result<usize> {
        let value = self.resolve_source(docs)?;
        let targets = Selector::from_ref(&self.target.selector).filter(docs);
        if targets.is_empty() {
            return Err(ReplaceError::TargetNotFound { selector: self.target.selector.clone() });
        }
        for &i in &targets {
            let doc = &mut docs[i];
            debug!(target = %doc.id(), paths = self.target.paths.len(), "writing replacement");
            for path in &self.target.paths {
                write(&mut doc.root, path, &value)?;
            }
        }
        counter!("replace_targets_mutated_total", targets.len() as u64);
        Ok(targets.len())
    }
}

/// Applies its rules in declaration order. Later rules see the writes of
/// earlier ones; the first error stops the run and leaves earlier writes in place.
#[derive(Debug, Clone)]
pub struct ReplacementTransformer {
    name: String,
    rules: Vec<Rule>,
}

impl ReplacementTransformer {
    pub fn new(config: &TransformerConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.replacements.iter().map(Rule::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { name: config.metadata.name.clone(), rules })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::new(&TransformerConfig::from_yaml(yaml)?)
    }

    pub fn from_rules(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self { name: name.into(), rules }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn transform(&self, docs: &mut [Document]) -> Result<()> {
        let started = Instant::now();
        for (i, rule) in self.rules.iter().enumerate() {
            match rule.apply(docs) {
                Ok(n) => {
                    counter!("replace_rules_applied_total", 1u64);
                    debug!(transformer = %self.name, rule = i, targets = n, "replacement applied");
                }
                Err(e) => {
                    counter!("replace_errors_total", 1u64);
                    warn!(transformer = %self.name, rule = i, error = %e, "replacement failed");
                    return Err(e);
                }
            }
        }
        let ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("replace_transform_ms", ms);
        info!(transformer = %self.name, rules = self.rules.len(), documents = docs.len(), elapsed_ms = ms, "replacements complete");
        Ok(())
    }

    /// Stream in, stream out: parse a YAML manifest stream, transform it, serialize it back.
    pub fn run(&self, input: &str) -> Result<String> {
        let mut docs = parse_stream(input)?;
        self.transform(&mut docs)?;
        Ok(to_yaml_stream(&docs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        Document::new(Node::from(v))
    }

    fn literal(value: &str, target: ObjectRef, paths: &[&str]) -> Rule {
        Rule {
            source: Source::Literal(Node::string(value)),
            target: Target { selector: target, paths: paths.iter().map(|p| FieldPath::parse(p).unwrap()).collect() },
        }
    }

    #[test]
    fn source_defaults_to_metadata_name() {
        let cfg = TransformerConfig::from_yaml(
            "replacements:\n- source:\n    objref: {kind: Secret}\n  target:\n    objref: {kind: Pod}\n    fieldrefs: [spec.secretName]\n",
        )
        .unwrap();
        let t = ReplacementTransformer::new(&cfg).unwrap();
        let mut docs = vec![
            doc(json!({ "kind": "Secret", "metadata": { "name": "creds" } })),
            doc(json!({ "kind": "Pod", "metadata": { "name": "p" }, "spec": {} })),
        ];
        t.transform(&mut docs).unwrap();
        assert_eq!(docs[1].root.get_path(&["spec", "secretName"]), Some(&Node::string("creds")));
    }

    #[test]
    fn source_pattern_is_rejected() {
        let err = ReplacementTransformer::from_yaml(
            "replacements:\n- source:\n    objref: {kind: A}\n    fieldref: a.b%x%\n  target:\n    objref: {kind: B}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ReplaceError::BadConfiguration(_)), "{err}");
    }

    #[test]
    fn invalid_target_pattern_fails_at_construction() {
        let err = ReplacementTransformer::from_yaml(
            "replacements:\n- source: {value: x}\n  target:\n    objref: {kind: B}\n    fieldrefs: ['a.b%[%']\n",
        )
        .unwrap_err();
        assert!(matches!(err, ReplaceError::InvalidPattern { .. }), "{err}");
    }

    #[test]
    fn target_must_match_something() {
        let t = ReplacementTransformer::from_rules("t", vec![literal("x", ObjectRef::kind("Nope"), &["a"])]);
        let mut docs = vec![doc(json!({ "kind": "Pod" }))];
        let err = t.transform(&mut docs).unwrap_err();
        assert!(matches!(err, ReplaceError::TargetNotFound { .. }), "{err}");
    }

    #[test]
    fn first_error_stops_without_rollback() {
        let t = ReplacementTransformer::from_rules(
            "t",
            vec![
                literal("one", ObjectRef::kind("Pod"), &["spec.a"]),
                literal("two", ObjectRef::kind("Pod"), &["spec.a.b"]),
                literal("three", ObjectRef::kind("Pod"), &["spec.c"]),
            ],
        );
        let mut docs = vec![doc(json!({ "kind": "Pod", "spec": {} }))];
        let err = t.transform(&mut docs).unwrap_err();
        assert!(matches!(err, ReplaceError::TypeMismatch { .. }), "{err}");
        assert_eq!(docs[0].root.get_path(&["spec", "a"]), Some(&Node::string("one")));
        assert_eq!(docs[0].root.get_path(&["spec", "c"]), None);
    }
}
