use remap_core::ObjectRef;

/// Everything that can stop a replacement run. None of these are retried:
/// the transformation is deterministic, so the output must not be trusted
/// once any of them is returned.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    #[error("bad configuration: {0}")]
    BadConfiguration(String),
    #[error("source not found: no resource matches {selector}")]
    SourceNotFound { selector: ObjectRef },
    #[error("target not found: no resource matches {selector}")]
    TargetNotFound { selector: ObjectRef },
    #[error("ambiguous source: {count} resources match {selector}, expected exactly one")]
    AmbiguousSource { selector: ObjectRef, count: usize },
    #[error("type mismatch at {at:?}: expected {expected}, found {actual}")]
    TypeMismatch { at: String, expected: &'static str, actual: &'static str },
    #[error("index {index} out of bound for sequence of length {len}")]
    IndexOutOfBound { index: i64, len: usize },
    #[error("segment {segment:?} is not a valid sequence index")]
    InvalidIndex { segment: String },
    #[error("field {field:?} not found")]
    FieldNotFound { field: String },
    #[error("substring pattern cannot be applied to {actual} at {at:?}: expected string or sequence of strings")]
    PatternTargetInvalid { at: String, actual: &'static str },
    #[error("substring pattern replacement must be a string or number, found {actual}")]
    PatternReplacementInvalid { actual: &'static str },
    #[error("invalid substring pattern {pattern:?}: {source}")]
    InvalidPattern { pattern: String, #[source] source: regex::Error },
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ReplaceError>;

impl ReplaceError {
    pub(crate) fn mismatch(at: &str, expected: &'static str, actual: &remap_core::Node) -> Self {
        ReplaceError::TypeMismatch { at: at.to_string(), expected, actual: actual.kind_name() }
    }
}
