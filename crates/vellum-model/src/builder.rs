//! Incremental tree building.
//!
//! External parsers (CommonMark and friends) drive document construction
//! through five operations: open a node, close it, add text under the
//! active marks, and toggle marks on and off. [`TreeBuilder`] keeps the
//! stack of open nodes and the active mark set, merges adjacent text runs
//! with identical marks, and fills in required content when a node closes.

use thiserror::Error;

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use crate::schema::{Attrs, NodeType, Schema};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("No open node")]
    NoOpenNode,
    #[error("Content does not fit in {0}")]
    ContentDoesNotFit(String),
    #[error("Cannot build document content")]
    NothingBuilt,
    #[error(transparent)]
    Model(#[from] ModelError),
}

struct StackItem {
    node_type: NodeType,
    attrs: Option<Attrs>,
    content: Vec<Node>,
    marks: Vec<Mark>,
}

/// Tracks the context of an in-progress document build.
pub struct TreeBuilder {
    schema: Schema,
    stack: Vec<StackItem>,
    root: Option<Node>,
}

impl TreeBuilder {
    pub fn new(schema: Schema) -> TreeBuilder {
        TreeBuilder {
            schema,
            stack: Vec::new(),
            root: None,
        }
    }

    fn top(&mut self) -> Result<&mut StackItem, BuildError> {
        self.stack.last_mut().ok_or(BuildError::NoOpenNode)
    }

    /// Wrap subsequent content in a node of the given type.
    pub fn open_node(&mut self, node_type: NodeType, attrs: Option<Attrs>) {
        self.stack.push(StackItem {
            node_type,
            attrs,
            content: Vec::new(),
            marks: Vec::new(),
        });
    }

    /// Close the node currently on top of the stack, filling in required
    /// content, and add it to its parent (or keep it as the build result
    /// when it was the outermost node).
    pub fn close_node(&mut self) -> Result<Node, BuildError> {
        let item = self.stack.pop().ok_or(BuildError::NoOpenNode)?;
        let node = item
            .node_type
            .create_and_fill(
                item.attrs.as_ref(),
                Fragment::from_nodes(item.content),
                &[],
            )?
            .ok_or_else(|| BuildError::ContentDoesNotFit(item.node_type.name().to_string()))?;
        match self.stack.last_mut() {
            Some(parent) => parent.content.push(node.clone()),
            None => self.root = Some(node.clone()),
        }
        Ok(node)
    }

    /// Add a leaf or pre-built node at the current position, carrying the
    /// active marks.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        attrs: Option<Attrs>,
        content: Vec<Node>,
    ) -> Result<Node, BuildError> {
        let marks = self.top()?.marks.clone();
        let node = node_type
            .create_and_fill(attrs.as_ref(), Fragment::from_nodes(content), &marks)?
            .ok_or_else(|| BuildError::ContentDoesNotFit(node_type.name().to_string()))?;
        self.top()?.content.push(node.clone());
        Ok(node)
    }

    /// Add text at the current position, styled with the active marks.
    /// Adjacent runs with identical marks merge into one text node.
    pub fn add_text(&mut self, text: &str) -> Result<(), BuildError> {
        if text.is_empty() {
            return Ok(());
        }
        let schema = self.schema.clone();
        let top = self.top()?;
        let node = schema.text_with_marks(text, &top.marks);
        if let Some(last) = top.content.last() {
            if last.is_text() && Mark::same_set(last.marks(), node.marks()) {
                let merged =
                    last.with_text(format!("{}{}", last.text_or_empty(), node.text_or_empty()));
                let end = top.content.len() - 1;
                top.content[end] = merged;
                return Ok(());
            }
        }
        top.content.push(node);
        Ok(())
    }

    /// Add the given mark to the set of active marks.
    pub fn open_mark(&mut self, mark: Mark) -> Result<(), BuildError> {
        let top = self.top()?;
        top.marks = mark.add_to_set(&top.marks);
        Ok(())
    }

    /// Remove the given mark from the set of active marks.
    pub fn close_mark(&mut self, mark: &Mark) -> Result<(), BuildError> {
        let top = self.top()?;
        top.marks = mark.remove_from_set(&top.marks);
        Ok(())
    }

    /// Close any remaining open nodes and return the completed root.
    pub fn finish(mut self) -> Result<Node, BuildError> {
        while !self.stack.is_empty() {
            self.close_node()?;
        }
        self.root.ok_or(BuildError::NothingBuilt)
    }
}
