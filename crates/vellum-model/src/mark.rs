//! Marks: styling information attached to inline content.
//!
//! A mark pairs a [`MarkType`] with an attribute map. Sets of marks are kept
//! as plain vectors, sorted ascending by the mark type's rank (its position
//! in the schema's mark declarations), with exclusion rules deciding which
//! marks may coexist.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::schema::{Attrs, MarkType, Schema};

/// A piece of information attached to a node, such as emphasis or a link
/// target. Immutable; created through [`MarkType::create`] or
/// [`Schema::mark`].
#[derive(Clone)]
pub struct Mark {
    data: Arc<MarkData>,
}

struct MarkData {
    mark_type: MarkType,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(mark_type: MarkType, attrs: Attrs) -> Mark {
        Mark {
            data: Arc::new(MarkData { mark_type, attrs }),
        }
    }

    /// The type of this mark.
    pub fn mark_type(&self) -> &MarkType {
        &self.data.mark_type
    }

    /// The attributes associated with this mark.
    pub fn attrs(&self) -> &Attrs {
        &self.data.attrs
    }

    /// Given a set of marks, create a new set which contains this one as
    /// well, in the right position. If this mark is already in the set, the
    /// set itself is returned. If any marks that are set to be exclusive
    /// with this mark are present, those are replaced by this one.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.mark_type().excludes(other.mark_type()) {
                if copy.is_none() {
                    copy = Some(set[..i].to_vec());
                }
            } else if other.mark_type().excludes(self.mark_type()) {
                return set.to_vec();
            } else {
                if !placed && other.mark_type().rank() > self.mark_type().rank() {
                    let copy = copy.get_or_insert_with(|| set[..i].to_vec());
                    copy.push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    /// Remove this mark from the given set, returning a new set. If this
    /// mark is not in the set, the set itself is returned.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        match set.iter().position(|other| self == other) {
            Some(i) => {
                let mut copy = set.to_vec();
                copy.remove(i);
                copy
            }
            None => set.to_vec(),
        }
    }

    /// Test whether this mark is in the given set of marks.
    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|other| self == other)
    }

    /// Test whether two sets of marks are identical.
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
    }

    /// Create a properly sorted mark set from an unsorted slice of marks.
    pub fn set_from(marks: &[Mark]) -> Vec<Mark> {
        if marks.len() < 2 {
            return marks.to_vec();
        }
        let mut set = marks.to_vec();
        set.sort_by_key(|m| m.mark_type().rank());
        set
    }

    /// Serialize this mark to its JSON representation.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "type".into(),
            Value::String(self.mark_type().name().to_string()),
        );
        if !self.attrs().is_empty() {
            obj.insert("attrs".into(), Value::Object(self.attrs().clone()));
        }
        Value::Object(obj)
    }

    /// Deserialize a mark from its JSON representation.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Mark, ModelError> {
        let obj = value.as_object().ok_or(ModelError::InvalidMarkData)?;
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ModelError::InvalidMarkData)?;
        let mark_type = schema
            .mark_type(name)
            .map_err(|_| ModelError::UnknownMarkInJson(name.to_string()))?;
        let attrs = match obj.get("attrs") {
            Some(Value::Object(attrs)) => Some(attrs),
            Some(Value::Null) | None => None,
            Some(_) => return Err(ModelError::InvalidMarkData),
        };
        mark_type.create(attrs)
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Mark) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
            || (self.mark_type() == other.mark_type() && self.attrs() == other.attrs())
    }
}

impl Eq for Mark {}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mark({})", self.mark_type().name())
    }
}
