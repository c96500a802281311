//! Slices: pieces cut out of a larger document.
//!
//! A slice stores a fragment plus the depth up to which nodes on either
//! side are "open" (cut through). The content of open nodes need not
//! conform to the schema's content constraints, though it must be a valid
//! start, middle, or end for such a node depending on which sides are open.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::Schema;

/// A fragment with two open-depth counters; the payload of every replace.
#[derive(Clone, PartialEq, Eq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    /// Create a slice. When specifying a non-zero open depth, there must be
    /// nodes of at least that depth at the matching side of the fragment.
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    /// The empty slice.
    pub fn empty() -> Slice {
        Slice::new(Fragment::empty(), 0, 0)
    }

    /// The slice's content.
    pub fn content(&self) -> &Fragment {
        &self.content
    }

    /// The open depth at the start of the fragment.
    pub fn open_start(&self) -> usize {
        self.open_start
    }

    /// The open depth at the end.
    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// The size a slice would add when inserted into a document.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    /// Insert the given fragment at `pos` inside the slice's content,
    /// descending into open nodes as needed. Returns `None` when the
    /// content does not fit there.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove the content between the two positions, which must sit in the
    /// same flat parent.
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        Ok(Slice::new(
            remove_range(&self.content, from + self.open_start, to + self.open_start)?,
            self.open_start,
            self.open_end,
        ))
    }

    /// Serialize to JSON; the empty slice serializes as `null`.
    pub fn to_json(&self) -> Value {
        if self.content.size() == 0 {
            return Value::Null;
        }
        let mut obj = Map::new();
        obj.insert("content".into(), self.content.to_json());
        if self.open_start > 0 {
            obj.insert("openStart".into(), Value::from(self.open_start as u64));
        }
        if self.open_end > 0 {
            obj.insert("openEnd".into(), Value::from(self.open_end as u64));
        }
        Value::Object(obj)
    }

    /// Deserialize a slice; `null` stands for the empty slice.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Slice, ModelError> {
        let obj = match value {
            Value::Null => return Ok(Slice::empty()),
            Value::Object(obj) => obj,
            _ => return Err(ModelError::InvalidSliceJson),
        };
        let open_count = |key: &str| -> Result<usize, ModelError> {
            match obj.get(key) {
                None => Ok(0),
                Some(v) => v
                    .as_u64()
                    .map(|n| n as usize)
                    .ok_or(ModelError::InvalidSliceJson),
            }
        };
        let open_start = open_count("openStart")?;
        let open_end = open_count("openEnd")?;
        let content = Fragment::from_json(schema, obj.get("content").unwrap_or(&Value::Null))?;
        Ok(Slice::new(content, open_start, open_end))
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.content, self.open_start, self.open_end)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist).ok()?;
    let child = content.maybe_child(index);
    if offset == dist || child.map_or(false, Node::is_text) {
        if let Some(parent) = parent {
            if !parent.can_replace(index, index, insert) {
                return None;
            }
        }
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut(dist, content.size())),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
    Some(content.replace_child(index, child.copy(inner)))
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ModelError> {
    let (index, offset) = content.find_index(from)?;
    let child = content.maybe_child(index);
    let (index_to, offset_to) = content.find_index(to)?;
    if offset == from || child.map_or(false, Node::is_text) {
        if offset_to != to && !content.child(index_to)?.is_text() {
            return Err(ModelError::RemovingNonFlatRange);
        }
        return Ok(content.cut(0, from).append(&content.cut(to, content.size())));
    }
    if index != index_to {
        return Err(ModelError::RemovingNonFlatRange);
    }
    let child = match child {
        Some(child) => child,
        None => return Err(ModelError::RemovingNonFlatRange),
    };
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}
