//! Fragments: the child sequences of nodes.
//!
//! Like nodes, fragments are persistent: the child vector sits behind an
//! `Arc` and every operation returns a new fragment, sharing structure with
//! the old one where possible. The cached size is the sum of the children's
//! node sizes.
//!
//! No fragment ever contains two adjacent text nodes with the same marks;
//! the constructors and `append` maintain that invariant by merging such
//! neighbours.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::diff::{self, DiffEnd};
use crate::error::ModelError;
use crate::node::Node;
use crate::schema::Schema;
use crate::text;

/// An ordered, immutable sequence of child nodes with a cached size.
#[derive(Clone)]
pub struct Fragment {
    content: Arc<Vec<Node>>,
    size: usize,
}

impl Fragment {
    /// The empty fragment.
    pub fn empty() -> Fragment {
        Fragment {
            content: Arc::new(Vec::new()),
            size: 0,
        }
    }

    /// Build a fragment from a vector of nodes, merging adjacent text nodes
    /// with the same markup.
    pub fn from_nodes(nodes: Vec<Node>) -> Fragment {
        if nodes.is_empty() {
            return Fragment::empty();
        }
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            match joined.last() {
                Some(last) if node.is_text() && node.same_markup(last) => {
                    let text = format!("{}{}", last.text_or_empty(), node.text_or_empty());
                    let merged = node.with_text(text);
                    let end = joined.len() - 1;
                    joined[end] = merged;
                }
                _ => joined.push(node),
            }
        }
        Fragment::from_vec(joined)
    }

    /// A fragment holding a single node.
    pub fn from_node(node: Node) -> Fragment {
        let size = node.node_size();
        Fragment {
            content: Arc::new(vec![node]),
            size,
        }
    }

    /// Internal constructor for child vectors that are already known to be
    /// merged.
    pub(crate) fn from_vec(nodes: Vec<Node>) -> Fragment {
        let size = nodes.iter().map(Node::node_size).sum();
        Fragment {
            content: Arc::new(nodes),
            size,
        }
    }

    /// The total size of the fragment's content.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The number of child nodes.
    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// The child at the given index; fails when out of range.
    pub fn child(&self, index: usize) -> Result<&Node, ModelError> {
        self.content
            .get(index)
            .ok_or_else(|| ModelError::IndexOutOfRange {
                index,
                fragment: self.to_string(),
            })
    }

    /// The child at the given index, or `None` when out of range.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    /// The first child, or `None` for the empty fragment.
    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    /// The last child, or `None` for the empty fragment.
    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    /// Iterate over the children.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.content.iter()
    }

    /// Create a new fragment containing this one's content followed by the
    /// other's. Text nodes at the seam are merged when their markup agrees.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other.clone();
        }
        let mut content: Vec<Node> = (*self.content).clone();
        let mut rest = other.content.iter();
        if let (Some(last), Some(first)) = (self.last_child(), other.first_child()) {
            if last.is_text() && last.same_markup(first) {
                let end = content.len() - 1;
                content[end] =
                    last.with_text(format!("{}{}", last.text_or_empty(), first.text_or_empty()));
                rest.next();
            }
        }
        content.extend(rest.cloned());
        Fragment {
            content: Arc::new(content),
            size: self.size + other.size,
        }
    }

    /// Cut out the sub-fragment between the two given positions.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut result_size = 0;
        if to > from {
            let mut pos = 0;
            for child in self.iter() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let child = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(
                                from.saturating_sub(pos),
                                (to - pos).min(text::len_utf16(child.text_or_empty())),
                            )
                        } else {
                            child.cut(
                                (from.saturating_sub(pos)).saturating_sub(1),
                                (to - pos - 1).min(child.content().size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result_size += child.node_size();
                    result.push(child);
                }
                pos = end;
            }
        }
        Fragment {
            content: Arc::new(result),
            size: result_size,
        }
    }

    /// Cut out the sub-fragment between the two child indices.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::empty();
        }
        if from == 0 && to == self.content.len() {
            return self.clone();
        }
        Fragment::from_vec(self.content[from..to].to_vec())
    }

    /// Create a new fragment in which the child at the given index is
    /// replaced by the given node.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        match self.maybe_child(index) {
            Some(current) if current.ptr_eq(&node) => self.clone(),
            Some(current) => {
                let size = self.size + node.node_size() - current.node_size();
                let mut content = (*self.content).clone();
                content[index] = node;
                Fragment {
                    content: Arc::new(content),
                    size,
                }
            }
            None => self.clone(),
        }
    }

    /// Create a new fragment by prepending the given node.
    pub fn add_to_start(&self, node: Node) -> Fragment {
        let size = self.size + node.node_size();
        let mut content = Vec::with_capacity(self.content.len() + 1);
        content.push(node);
        content.extend(self.iter().cloned());
        Fragment {
            content: Arc::new(content),
            size,
        }
    }

    /// Create a new fragment by appending the given node.
    pub fn add_to_end(&self, node: Node) -> Fragment {
        let size = self.size + node.node_size();
        let mut content = (*self.content).clone();
        content.push(node);
        Fragment {
            content: Arc::new(content),
            size,
        }
    }

    /// Find the child covering the given position. Returns the child index
    /// and the position at which that child starts. A position on the
    /// boundary between two children is attributed to the one starting
    /// there, so the returned offset equals `pos` exactly at boundaries;
    /// position resolution relies on that.
    pub fn find_index(&self, pos: usize) -> Result<(usize, usize), ModelError> {
        self.find_index_round(pos, 1)
    }

    /// Like [`Fragment::find_index`], but `round < 0` attributes a
    /// boundary position to the child ending there instead.
    pub fn find_index_round(&self, pos: usize, round: i32) -> Result<(usize, usize), ModelError> {
        if pos == 0 {
            return Ok((0, pos));
        }
        if pos == self.size {
            return Ok((self.content.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutsideFragment {
                pos,
                fragment: self.to_string(),
            });
        }
        let mut cur_pos = 0;
        for (i, cur) in self.iter().enumerate() {
            let end = cur_pos + cur.node_size();
            if end >= pos {
                if end == pos {
                    if round < 0 {
                        return Ok((i, cur_pos));
                    }
                    return Ok((i + 1, end));
                }
                return Ok((i, cur_pos));
            }
            cur_pos = end;
        }
        Err(ModelError::PositionOutsideFragment {
            pos,
            fragment: self.to_string(),
        })
    }

    /// Find the first position at which this fragment and another differ,
    /// or `None` if they are the same.
    pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
        diff::find_diff_start(self, other, pos)
    }

    /// Find the first position, searching from the end, at which this
    /// fragment and the other differ. Since that position will in general
    /// not be the same in both fragments, both are returned.
    pub fn find_diff_end(
        &self,
        other: &Fragment,
        pos_a: usize,
        pos_b: usize,
    ) -> Option<DiffEnd> {
        diff::find_diff_end(self, other, pos_a, pos_b)
    }

    /// Call `f` for every descendant node between the two positions,
    /// passing the node, its absolute position, its parent, and its child
    /// index. A callback returning `false` prevents descent into that node.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
        node_start: usize,
        parent: Option<&Node>,
    ) {
        let mut pos = 0;
        for (i, child) in self.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content().size().min(to - start),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    /// The text between the two positions, with `block_separator` inserted
    /// between block boundaries and `leaf_text` standing in for non-text
    /// leaves.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        let mut out = String::new();
        let mut separated = true;
        self.nodes_between(
            from,
            to,
            &mut |node, pos, _, _| {
                if node.is_text() {
                    let txt = node.text_or_empty();
                    out.push_str(&text::cut(txt, from.max(pos) - pos, to - pos));
                    separated = block_separator.is_none();
                } else if node.is_leaf() {
                    if let Some(leaf_text) = leaf_text {
                        out.push_str(leaf_text);
                    }
                    separated = block_separator.is_none();
                } else if !separated && node.is_block() {
                    if let Some(sep) = block_separator {
                        out.push_str(sep);
                    }
                    separated = true;
                }
                true
            },
            0,
            None,
        );
        out
    }

    /// Serialize to JSON: an array of child nodes, or `null` when empty.
    pub fn to_json(&self) -> Value {
        if self.content.is_empty() {
            Value::Null
        } else {
            Value::Array(self.iter().map(Node::to_json).collect())
        }
    }

    /// Deserialize a fragment from its JSON representation.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Fragment, ModelError> {
        match value {
            Value::Null => Ok(Fragment::empty()),
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    nodes.push(Node::from_json(schema, item)?);
                }
                Ok(Fragment::from_nodes(nodes))
            }
            _ => Err(ModelError::InvalidFragmentJson),
        }
    }

    pub(crate) fn to_string_inner(&self) -> String {
        self.iter()
            .map(Node::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Fragment) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
            || (self.content.len() == other.content.len()
                && self.iter().zip(other.iter()).all(|(a, b)| a == b))
    }
}

impl Eq for Fragment {}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.to_string_inner())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
