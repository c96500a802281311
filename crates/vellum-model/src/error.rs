//! Runtime errors produced by document values.
//!
//! Schema compilation has its own error type ([`SchemaError`]); everything
//! that can go wrong while operating on documents funnels through
//! [`ModelError`] so callers deal with a single error surface. The message
//! strings are part of the wire-level contract and are asserted by tests;
//! collaborating peers match on them.

use thiserror::Error;

use crate::replace::ReplaceError;
use crate::schema::SchemaError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Position {0} out of range")]
    PositionOutOfRange(usize),
    #[error("Position {pos} outside of fragment ({fragment})")]
    PositionOutsideFragment { pos: usize, fragment: String },
    #[error("Index {index} out of range for {fragment}")]
    IndexOutOfRange { index: usize, fragment: String },
    #[error("Removing non-flat range")]
    RemovingNonFlatRange,
    #[error("There is no position before the top-level node")]
    BeforeTopLevelNode,
    #[error("There is no position after the top-level node")]
    AfterTopLevelNode,
    #[error("Called content_match_at on a node with invalid content")]
    InvalidContentMatch,

    #[error("No value supplied for attribute {0}")]
    MissingAttribute(String),
    #[error("NodeType.create can't construct text nodes")]
    TextNodeViaCreate,
    #[error("Node type from different schema used ({0})")]
    ForeignNodeType(String),

    #[error(transparent)]
    Replace(#[from] ReplaceError),
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Invalid input for Node.fromJSON")]
    InvalidNodeJson,
    #[error("Invalid text node in JSON")]
    InvalidTextNode,
    #[error("Invalid mark data")]
    InvalidMarkData,
    #[error("There is no mark {0} in this schema")]
    UnknownMarkInJson(String),
    #[error("Invalid input for Fragment.fromJSON")]
    InvalidFragmentJson,
    #[error("Invalid input for Slice.fromJSON")]
    InvalidSliceJson,
    #[error("Invalid input for SchemaSpec.fromJSON")]
    InvalidSchemaSpecJson,
}
