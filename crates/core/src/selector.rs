//! Resource selection: a chain of independent narrowing filters.
//!
//! Every filter is optional and an empty value is a wildcard, so the order of
//! application never changes the result set. Cardinality checks (no match,
//! more than one match) belong to the caller.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{split_api_version, Document};

/// Partial identity used to pick resources. Absent (or empty) fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectRef {
    pub fn kind(kind: &str) -> Self {
        Self { kind: Some(kind.to_string()), ..Self::default() }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_namespace(mut self, ns: &str) -> Self {
        self.namespace = Some(ns.to_string());
        self
    }

    pub fn with_group_version(mut self, group: &str, version: &str) -> Self {
        self.group = Some(group.to_string());
        self.version = Some(version.to_string());
        self
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = Some(api_version.to_string());
        self
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            ("apiVersion", &self.api_version),
            ("group", &self.group),
            ("version", &self.version),
            ("kind", &self.kind),
            ("name", &self.name),
            ("namespace", &self.namespace),
        ];
        let rendered: Vec<String> = parts
            .iter()
            .filter_map(|(k, v)| v.as_deref().filter(|s| !s.is_empty()).map(|s| format!("{}={}", k, s)))
            .collect();
        if rendered.is_empty() {
            f.write_str("{*}")
        } else {
            write!(f, "{{{}}}", rendered.join(", "))
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    ApiVersion { group: String, version: String },
    Group(String),
    Version(String),
    Kind(String),
    Name(String),
    Namespace(String),
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::ApiVersion { group, version } => {
                let (g, v) = split_api_version(doc.api_version());
                g == group && v == version
            }
            Filter::Group(g) => split_api_version(doc.api_version()).0 == g,
            Filter::Version(v) => split_api_version(doc.api_version()).1 == v,
            Filter::Kind(k) => doc.kind() == k,
            Filter::Name(n) => doc.name() == n,
            Filter::Namespace(ns) => doc.namespace() == ns,
        }
    }
}

/// Chainable selector, e.g.
/// `Selector::default().by_gvk("apps", "v1", "Deployment").by_name("web")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    filters: Vec<Filter>,
}

impl Selector {
    pub fn from_ref(r: &ObjectRef) -> Self {
        Selector::default()
            .by_api_version(r.api_version.as_deref())
            .by_gvk(r.group.as_deref(), r.version.as_deref(), r.kind.as_deref())
            .by_name(r.name.as_deref())
            .by_namespace(r.namespace.as_deref())
    }

    pub fn by_api_version(mut self, api_version: Option<&str>) -> Self {
        if let Some(av) = non_empty(api_version) {
            let (group, version) = split_api_version(&av);
            self.filters.push(Filter::ApiVersion { group: group.to_string(), version: version.to_string() });
        }
        self
    }

    pub fn by_gvk(mut self, group: Option<&str>, version: Option<&str>, kind: Option<&str>) -> Self {
        if let Some(g) = non_empty(group) { self.filters.push(Filter::Group(g)); }
        if let Some(v) = non_empty(version) { self.filters.push(Filter::Version(v)); }
        if let Some(k) = non_empty(kind) { self.filters.push(Filter::Kind(k)); }
        self
    }

    pub fn by_name(mut self, name: Option<&str>) -> Self {
        if let Some(n) = non_empty(name) { self.filters.push(Filter::Name(n)); }
        self
    }

    pub fn by_namespace(mut self, namespace: Option<&str>) -> Self {
        if let Some(ns) = non_empty(namespace) { self.filters.push(Filter::Namespace(ns)); }
        self
    }

    /// True when no filter was configured; such a selector matches every document.
    pub fn is_wildcard(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Indices of matching documents, in document order.
    pub fn filter(&self, docs: &[Document]) -> Vec<usize> {
        docs.iter()
            .enumerate()
            .filter(|(_, d)| self.matches(d))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn select<'a>(&self, docs: &'a [Document]) -> Vec<&'a Document> {
        docs.iter().filter(|d| self.matches(d)).collect()
    }
}
