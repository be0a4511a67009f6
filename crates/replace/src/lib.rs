//! Remap replacement engine: copy a value from one resource (or a literal)
//! into field paths of other resources, optionally as a regex substitution.
//!
//! Rules run strictly in order and mutate the caller's documents in place;
//! a document set must not be shared between concurrent runs.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod mutate;
pub mod path;
pub mod substring;
pub mod transformer;

pub use config::{ReplacementSpec, SourceSpec, TargetSpec, TransformerConfig};
pub use error::{ReplaceError, Result};
pub use mutate::{lookup, write};
pub use path::{FieldPath, Segment, SubstringPattern};
pub use transformer::{ReplacementTransformer, Rule, Source, Target};
