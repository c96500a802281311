//! The vellum document model.
//!
//! Structured, marked-up documents as persistent trees: nodes tagged with
//! schema-compiled types, fragments of children with cached sizes, marks
//! with exclusion rules, linear positions resolvable into full ancestor
//! context, and a single replace algorithm through which every structural
//! edit is expressed.
//!
//! Documents are immutable. Editing produces a new root that shares
//! unchanged subtrees with the old one, so concurrent readers may freely
//! hold on to older versions.

pub mod builder;
pub mod content;
pub mod diff;
pub mod error;
pub mod fragment;
pub mod mark;
pub mod node;
pub mod replace;
pub mod resolve;
pub mod schema;
pub mod slice;
pub mod text;

pub use builder::{BuildError, TreeBuilder};
pub use content::ContentMatch;
pub use diff::DiffEnd;
pub use error::ModelError;
pub use fragment::Fragment;
pub use mark::Mark;
pub use node::Node;
pub use replace::ReplaceError;
pub use resolve::ResolvedPos;
pub use schema::{
    AttributeSpec, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaError, SchemaSpec,
};
pub use slice::Slice;

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
