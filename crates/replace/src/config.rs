//! Transformer configuration document.
//!
//! ```yaml
//! apiVersion: airshipit.org/v1alpha1
//! kind: ReplacementTransformer
//! metadata:
//!   name: network-replacements
//! replacements:
//! - source:
//!     objref: { kind: ConfigMap, name: network }
//!     fieldref: data.cidr
//!   target:
//!     objref: { kind: Cluster }
//!     fieldrefs: ["spec.clusterNetwork.pods.cidrBlocks.0"]
//! ```

use remap_core::{Node, ObjectRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{ReplaceError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerConfig {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub replacements: Vec<ReplacementSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplacementSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSpec>,
}

/// Where the replacement value comes from: a field of another resource, or a literal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(rename = "objref", default, skip_serializing_if = "Option::is_none")]
    pub obj_ref: Option<ObjectRef>,
    /// Defaults to `metadata.name`.
    #[serde(rename = "fieldref", default, skip_serializing_if = "Option::is_none")]
    pub field_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Node>,
}

impl SourceSpec {
    /// The literal value, treating an empty string the same as no value.
    pub fn literal(&self) -> Option<&Node> {
        self.value.as_ref().filter(|v| v.as_str() != Some(""))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(rename = "objref", default, skip_serializing_if = "Option::is_none")]
    pub obj_ref: Option<ObjectRef>,
    #[serde(rename = "fieldrefs", default)]
    pub field_refs: Vec<String>,
}

impl TransformerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Structural checks; path syntax is checked when the transformer compiles the rules.
    pub fn validate(&self) -> Result<()> {
        for (i, r) in self.replacements.iter().enumerate() {
            let bad = |msg: &str| Err(ReplaceError::BadConfiguration(format!("replacement #{}: {}", i, msg)));
            let Some(source) = &r.source else { return bad("source must be specified") };
            let Some(target) = &r.target else { return bad("target must be specified") };
            match (&source.obj_ref, source.literal()) {
                (Some(_), Some(_)) => return bad("only one of objref and value is allowed"),
                (None, None) => return bad("one of objref or value must be set"),
                _ => {}
            }
            match &target.obj_ref {
                None => return bad("target objref must be specified"),
                Some(r) if Selector::from_ref(r).is_wildcard() => {
                    return bad("target objref must narrow the selection (it matches every resource)")
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
