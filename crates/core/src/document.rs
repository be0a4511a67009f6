//! Resources and the multi-document manifest stream.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// Identity of a resource, derived from its `apiVersion`, `kind` and `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResId {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl ResId {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)?;
        if self.namespace.is_empty() {
            write!(f, " {}", self.name)
        } else {
            write!(f, " {}/{}", self.namespace, self.name)
        }
    }
}

/// Split `group/version` (or bare `version` for the core group).
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rsplit_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// One resource. Identity is read from the tree each time so that mutations
/// to `metadata.name` and friends are visible to later selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub root: Node,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    fn field(&self, keys: &[&str]) -> &str {
        self.root.get_path(keys).and_then(Node::as_str).unwrap_or("")
    }

    pub fn api_version(&self) -> &str {
        self.field(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.field(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.field(&["metadata", "name"])
    }

    pub fn namespace(&self) -> &str {
        self.field(&["metadata", "namespace"])
    }

    pub fn id(&self) -> ResId {
        let (group, version) = split_api_version(self.api_version());
        ResId {
            group: group.to_string(),
            version: version.to_string(),
            kind: self.kind().to_string(),
            name: self.name().to_string(),
            namespace: self.namespace().to_string(),
        }
    }
}

impl From<Node> for Document {
    fn from(root: Node) -> Self {
        Self::new(root)
    }
}

/// Parse a `---` separated YAML stream. Empty documents are skipped.
pub fn parse_stream(yaml: &str) -> Result<Vec<Document>, serde_yaml::Error> {
    let mut out = Vec::new();
    for de in serde_yaml::Deserializer::from_str(yaml) {
        let root = Node::deserialize(de)?;
        if root.is_null() {
            continue;
        }
        out.push(Document::new(root));
    }
    Ok(out)
}

/// Serialize documents back into a `---` separated YAML stream.
pub fn to_yaml_stream(docs: &[Document]) -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for (i, doc) in docs.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&serde_yaml::to_string(&doc.root)?);
    }
    Ok(out)
}
