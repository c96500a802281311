//! Document nodes.
//!
//! A document is a [`Node`] whose children are nodes again. Nodes are
//! persistent: instead of changing one, you create a new one with the
//! content you want, and unchanged subtrees are shared between the old and
//! new tree. There are no parent pointers; upward context comes from
//! [`ResolvedPos`](crate::ResolvedPos).
//!
//! A node is either a text leaf (it carries a string and has no content) or
//! a structural node (it carries a fragment of children). Both shapes are
//! produced only through schema constructors, which check attributes and,
//! for the checked variants, content.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::content::ContentMatch;
use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::replace;
use crate::resolve::{self, ResolvedPos};
use crate::schema::{Attrs, NodeType, Schema};
use crate::slice::Slice;
use crate::text;

/// A node in the document tree.
#[derive(Clone)]
pub struct Node {
    data: Arc<NodeData>,
}

struct NodeData {
    node_type: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
}

impl Node {
    pub(crate) fn new(
        node_type: NodeType,
        attrs: Attrs,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Node {
        Node {
            data: Arc::new(NodeData {
                node_type,
                attrs,
                content,
                marks,
                text: None,
            }),
        }
    }

    pub(crate) fn new_text(node_type: NodeType, text: String, marks: Vec<Mark>) -> Node {
        Node {
            data: Arc::new(NodeData {
                node_type,
                attrs: Attrs::new(),
                content: Fragment::empty(),
                marks,
                text: Some(text),
            }),
        }
    }

    /// Two handles to the very same node value.
    pub(crate) fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// The type of this node.
    pub fn node_type(&self) -> &NodeType {
        &self.data.node_type
    }

    /// The schema this node belongs to.
    pub fn schema(&self) -> &Schema {
        self.data.node_type.schema()
    }

    /// This node's attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.data.attrs
    }

    /// The marks applied to this node.
    pub fn marks(&self) -> &[Mark] {
        &self.data.marks
    }

    /// The node's children, as a fragment. Empty for leaves and text.
    pub fn content(&self) -> &Fragment {
        &self.data.content
    }

    /// For text nodes, the node's text.
    pub fn text(&self) -> Option<&str> {
        self.data.text.as_deref()
    }

    pub(crate) fn text_or_empty(&self) -> &str {
        self.data.text.as_deref().unwrap_or("")
    }

    /// True when this is a text node.
    pub fn is_text(&self) -> bool {
        self.data.text.is_some()
    }

    /// True when this is a block node.
    pub fn is_block(&self) -> bool {
        self.node_type().is_block()
    }

    /// True when this is an inline node (a text node or a node of inline
    /// type).
    pub fn is_inline(&self) -> bool {
        self.node_type().is_inline()
    }

    /// True when this node allows no content.
    pub fn is_leaf(&self) -> bool {
        self.node_type().is_leaf()
    }

    /// True when this is a block node with inline content.
    pub fn is_textblock(&self) -> bool {
        self.node_type().is_textblock()
    }

    /// True when this node has no directly editable content.
    pub fn is_atom(&self) -> bool {
        self.node_type().is_atom()
    }

    /// The size of this node. Text nodes count their UTF-16 code units,
    /// other leaves count one, and non-leaves count their content size plus
    /// the two enclosing tokens.
    pub fn node_size(&self) -> usize {
        match &self.data.text {
            Some(text) => text::len_utf16(text),
            None if self.is_leaf() => 1,
            None => 2 + self.data.content.size(),
        }
    }

    /// The number of children.
    pub fn child_count(&self) -> usize {
        self.data.content.child_count()
    }

    /// The child at the given index; fails when out of range.
    pub fn child(&self, index: usize) -> Result<&Node, ModelError> {
        self.data.content.child(index)
    }

    /// The child at the given index, or `None`.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.data.content.maybe_child(index)
    }

    /// The first child, or `None`.
    pub fn first_child(&self) -> Option<&Node> {
        self.data.content.first_child()
    }

    /// The last child, or `None`.
    pub fn last_child(&self) -> Option<&Node> {
        self.data.content.last_child()
    }

    /// Compare the markup (type, attributes, and marks) of this node to
    /// those of another.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.node_type(), other.attrs(), other.marks())
    }

    /// Check whether this node's markup matches the given type, attributes,
    /// and marks. Attribute comparison is structural.
    pub fn has_markup(&self, node_type: &NodeType, attrs: &Attrs, marks: &[Mark]) -> bool {
        self.node_type() == node_type
            && self.attrs() == attrs
            && Mark::same_set(self.marks(), marks)
    }

    /// Create a copy of this node with the given content.
    pub fn copy(&self, content: Fragment) -> Node {
        if self.is_text() {
            return self.clone();
        }
        Node::new(
            self.node_type().clone(),
            self.attrs().clone(),
            content,
            self.marks().to_vec(),
        )
    }

    /// Create a copy of this node with the given set of marks instead of
    /// the node's own marks.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(self.marks(), &marks) {
            return self.clone();
        }
        Node {
            data: Arc::new(NodeData {
                node_type: self.node_type().clone(),
                attrs: self.attrs().clone(),
                content: self.content().clone(),
                marks,
                text: self.data.text.clone(),
            }),
        }
    }

    /// A copy of this text node with its text replaced. Only meaningful for
    /// text nodes.
    pub fn with_text(&self, text: String) -> Node {
        debug_assert!(self.is_text());
        if Some(text.as_str()) == self.text() {
            return self.clone();
        }
        Node {
            data: Arc::new(NodeData {
                node_type: self.node_type().clone(),
                attrs: self.attrs().clone(),
                content: Fragment::empty(),
                marks: self.marks().to_vec(),
                text: Some(text),
            }),
        }
    }

    /// Create a copy of this node containing only the content between the
    /// given positions. For text nodes the positions are UTF-16 units into
    /// the text.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.data.text {
            Some(txt) => {
                let len = text::len_utf16(txt);
                let to = to.min(len);
                if from == 0 && to == len {
                    self.clone()
                } else {
                    self.with_text(text::cut(txt, from, to))
                }
            }
            None => {
                if from == 0 && to == self.content().size() {
                    self.clone()
                } else {
                    self.copy(self.content().cut(from, to))
                }
            }
        }
    }

    /// Like [`Node::cut`], cutting to the end of the node.
    pub fn cut_from(&self, from: usize) -> Node {
        let end = match &self.data.text {
            Some(txt) => text::len_utf16(txt),
            None => self.content().size(),
        };
        self.cut(from, end)
    }

    /// Cut out the slice between the two positions. With `include_parents`,
    /// the slice is taken from the root rather than the deepest shared
    /// ancestor.
    pub fn slice(
        &self,
        from: usize,
        to: usize,
        include_parents: bool,
    ) -> Result<Slice, ModelError> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = if include_parents {
            0
        } else {
            rfrom.shared_depth(to)
        };
        let start = rfrom.start(depth);
        let content = rfrom
            .node(depth)
            .content()
            .cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(
            content,
            rfrom.depth() - depth,
            rto.depth() - depth,
        ))
    }

    /// Replace the part of the document between the given positions with
    /// the given slice, producing a new document.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    /// Resolve a position, giving back its full ancestor context. Results
    /// go through a small process-wide cache.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ModelError> {
        resolve::resolve_cached(self, pos)
    }

    /// Resolve a position without consulting the cache.
    pub fn resolve_no_cache(&self, pos: usize) -> Result<ResolvedPos, ModelError> {
        resolve::resolve(self, pos)
    }

    /// Find the descendant node after the given position, if any.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos).ok()?;
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// The content match after parsing the first `index` children of this
    /// node.
    pub fn content_match_at(&self, index: usize) -> Result<ContentMatch, ModelError> {
        self.node_type()
            .content_match()
            .match_fragment_range(self.content(), 0, index)
            .ok_or(ModelError::InvalidContentMatch)
    }

    /// Test whether replacing the child index range `from..to` with the
    /// given fragment would leave the node's content valid.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        self.can_replace_range(from, to, replacement, 0, replacement.child_count())
    }

    /// Like [`Node::can_replace`], using the slice `start..end` of the
    /// replacement fragment.
    pub fn can_replace_range(
        &self,
        from: usize,
        to: usize,
        replacement: &Fragment,
        start: usize,
        end: usize,
    ) -> bool {
        let one = match self.content_match_at(from) {
            Ok(m) => m,
            Err(_) => return false,
        };
        let one = match one.match_fragment_range(replacement, start, end) {
            Some(m) => m,
            None => return false,
        };
        let two = match one.match_fragment_range(self.content(), to, self.child_count()) {
            Some(m) => m,
            None => return false,
        };
        if !two.valid_end() {
            return false;
        }
        (start..end).all(|i| match replacement.maybe_child(i) {
            Some(child) => self.node_type().allows_marks(child.marks()),
            None => false,
        })
    }

    /// Call `f` for every descendant between the two positions. Returning
    /// `false` from the callback skips that node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    ) {
        self.content().nodes_between(from, to, f, 0, Some(self));
    }

    /// Call `f` for every descendant node.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool) {
        self.nodes_between(0, self.content().size(), f);
    }

    /// Concatenation of all text in this node.
    pub fn text_content(&self) -> String {
        match &self.data.text {
            Some(text) => text.clone(),
            None => self
                .content()
                .text_between(0, self.content().size(), None, None),
        }
    }

    /// The text between the given positions, separating blocks with
    /// `block_separator` and standing in `leaf_text` for non-text leaves.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        self.content()
            .text_between(from, to, block_separator, leaf_text)
    }

    /// Serialize this node to JSON.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "type".into(),
            Value::String(self.node_type().name().to_string()),
        );
        if !self.attrs().is_empty() {
            obj.insert("attrs".into(), Value::Object(self.attrs().clone()));
        }
        if let Some(text) = self.text() {
            obj.insert("text".into(), Value::String(text.to_string()));
        } else if self.content().size() > 0 {
            obj.insert("content".into(), self.content().to_json());
        }
        if !self.marks().is_empty() {
            obj.insert(
                "marks".into(),
                Value::Array(self.marks().iter().map(Mark::to_json).collect()),
            );
        }
        Value::Object(obj)
    }

    /// Deserialize a node from its JSON representation.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node, ModelError> {
        let obj = value.as_object().ok_or(ModelError::InvalidNodeJson)?;
        let marks = match obj.get("marks") {
            Some(Value::Array(items)) => {
                let mut marks = Vec::with_capacity(items.len());
                for item in items {
                    marks.push(Mark::from_json(schema, item)?);
                }
                marks
            }
            Some(_) => return Err(ModelError::InvalidMarkData),
            None => Vec::new(),
        };
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ModelError::InvalidNodeJson)?;
        if type_name == "text" {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or(ModelError::InvalidTextNode)?;
            return Ok(schema.text_with_marks(text, &marks));
        }
        let content = Fragment::from_json(schema, obj.get("content").unwrap_or(&Value::Null))?;
        let attrs: Option<&Attrs> = match obj.get("attrs") {
            Some(Value::Object(attrs)) => Some(attrs),
            _ => None,
        };
        schema.node_type(type_name)?.create(attrs, content, &marks)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        self.ptr_eq(other)
            || (self.same_markup(other)
                && self.text() == other.text()
                && self.content() == other.content())
    }
}

impl Eq for Node {}

fn wrap_marks(marks: &[Mark], inner: String) -> String {
    let mut out = inner;
    for mark in marks.iter().rev() {
        out = format!("{}({})", mark.mark_type().name(), out);
    }
    out
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(to_debug) = self.node_type().spec().to_debug_string {
            return write!(f, "{}", to_debug(self));
        }
        if let Some(text) = self.text() {
            return write!(f, "{}", wrap_marks(self.marks(), format!("{:?}", text)));
        }
        let mut name = self.node_type().name().to_string();
        if self.content().size() > 0 {
            name = format!("{}({})", name, self.content().to_string_inner());
        }
        write!(f, "{}", wrap_marks(self.marks(), name))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
