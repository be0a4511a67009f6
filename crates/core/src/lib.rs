//! Remap core types: the resource field tree, resource identity and selection.

#![forbid(unsafe_code)]

pub mod document;
pub mod node;
pub mod selector;

pub use document::{parse_stream, to_yaml_stream, Document, ResId};
pub use node::{Mapping, Node, Scalar};
pub use selector::{ObjectRef, Selector};

pub mod prelude {
    pub use super::{Document, Mapping, Node, ObjectRef, ResId, Scalar, Selector};
}
