//! Replace and replace-around steps.

use serde_json::{Map, Value};

use vellum_model::{Node, Schema, Slice};

use crate::map::{Mappable, StepMap};
use crate::step::{from_replace, usize_field, Step, StepError, StepJsonError, StepResult};

/// Replaces a part of the document with a slice of new content.
///
/// The slice must fit the gap between `from` and `to`: the depths must line
/// up, and the surrounding nodes must be joinable with the slice's open
/// sides. When `structure` is set, the step fails if the replaced range
/// contains anything but closing-then-opening tokens; this guards rebased
/// steps against overwriting content they never saw.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    pub structure: bool,
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice, structure: bool) -> ReplaceStep {
        ReplaceStep {
            from,
            to,
            slice,
            structure,
        }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        if self.structure && content_between(doc, self.from, self.to) {
            return Err(StepError(
                "Structure replace would overwrite content".into(),
            ));
        }
        from_replace(doc, self.from, self.to, &self.slice)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            self.from,
            self.to.saturating_sub(self.from),
            self.slice.size(),
        ])
    }

    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        let slice = doc.slice(self.from, self.to, false).map_err(StepError::from)?;
        Ok(Step::Replace(ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            slice,
            false,
        )))
    }

    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if from.deleted && to.deleted {
            return None;
        }
        Some(Step::Replace(ReplaceStep::new(
            from.pos,
            from.pos.max(to.pos),
            self.slice.clone(),
            self.structure,
        )))
    }

    /// Fuse with a replace applied directly after this one. Rejected when
    /// either step is structural or when open sides meet at the seam.
    pub fn merge(&self, other: &ReplaceStep) -> Option<Step> {
        if self.structure || other.structure {
            return None;
        }
        if self.from + self.slice.size() == other.from
            && self.slice.open_end() == 0
            && other.slice.open_start() == 0
        {
            let slice = if self.slice.size() + other.slice.size() == 0 {
                Slice::empty()
            } else {
                Slice::new(
                    self.slice.content().append(other.slice.content()),
                    self.slice.open_start(),
                    other.slice.open_end(),
                )
            };
            Some(Step::Replace(ReplaceStep::new(
                self.from,
                self.to + (other.to - other.from),
                slice,
                false,
            )))
        } else if other.to == self.from
            && self.slice.open_start() == 0
            && other.slice.open_end() == 0
        {
            let slice = if self.slice.size() + other.slice.size() == 0 {
                Slice::empty()
            } else {
                Slice::new(
                    other.slice.content().append(self.slice.content()),
                    other.slice.open_start(),
                    self.slice.open_end(),
                )
            };
            Some(Step::Replace(ReplaceStep::new(
                other.from,
                self.to,
                slice,
                false,
            )))
        } else {
            None
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("replace".into()));
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        if self.slice.size() > 0 {
            obj.insert("slice".into(), self.slice.to_json());
        }
        if self.structure {
            obj.insert("structure".into(), Value::Bool(true));
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, obj: &Map<String, Value>) -> Result<Step, StepJsonError> {
        let from = usize_field(obj, "from", "ReplaceStep")?;
        let to = usize_field(obj, "to", "ReplaceStep")?;
        let slice = Slice::from_json(schema, obj.get("slice").unwrap_or(&Value::Null))?;
        let structure = obj
            .get("structure")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Step::Replace(ReplaceStep::new(from, to, slice, structure)))
    }
}

/// Replaces a part of the document with a slice, but preserves a sub-range
/// of the replaced content (the gap) by moving it into the slice. Used for
/// wrapping and unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    /// The position in the slice into which the gap's content is moved.
    pub insert: usize,
    pub structure: bool,
}

impl ReplaceAroundStep {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
        structure: bool,
    ) -> ReplaceAroundStep {
        ReplaceAroundStep {
            from,
            to,
            gap_from,
            gap_to,
            slice,
            insert,
            structure,
        }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        if self.structure
            && (content_between(doc, self.from, self.gap_from)
                || content_between(doc, self.gap_to, self.to))
        {
            return Err(StepError(
                "Structure gap-replace would overwrite content".into(),
            ));
        }
        let gap = doc
            .slice(self.gap_from, self.gap_to, false)
            .map_err(StepError::from)?;
        if gap.open_start() != 0 || gap.open_end() != 0 {
            return Err(StepError("Gap is not a flat range".into()));
        }
        let inserted = self
            .slice
            .insert_at(self.insert, gap.content())
            .ok_or_else(|| StepError("Content does not fit in gap".into()))?;
        from_replace(doc, self.from, self.to, &inserted)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            self.from,
            self.gap_from.saturating_sub(self.from),
            self.insert,
            self.gap_to,
            self.to.saturating_sub(self.gap_to),
            self.slice.size().saturating_sub(self.insert),
        ])
    }

    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        let gap = self.gap_to - self.gap_from;
        let slice = doc
            .slice(self.from, self.to, false)
            .map_err(StepError::from)?
            .remove_between(self.gap_from - self.from, self.gap_to - self.from)
            .map_err(StepError::from)?;
        Ok(Step::ReplaceAround(ReplaceAroundStep::new(
            self.from,
            self.from + self.slice.size() + gap,
            self.from + self.insert,
            self.from + self.insert + gap,
            slice,
            self.gap_from - self.from,
            self.structure,
        )))
    }

    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        let gap_from = mapping.map(self.gap_from, -1);
        let gap_to = mapping.map(self.gap_to, 1);
        if (from.deleted && to.deleted) || gap_from < from.pos || gap_to > to.pos {
            return None;
        }
        Some(Step::ReplaceAround(ReplaceAroundStep::new(
            from.pos,
            to.pos,
            gap_from,
            gap_to,
            self.slice.clone(),
            self.insert,
            self.structure,
        )))
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("replaceAround".into()));
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        obj.insert("gapFrom".into(), Value::from(self.gap_from as u64));
        obj.insert("gapTo".into(), Value::from(self.gap_to as u64));
        obj.insert("insert".into(), Value::from(self.insert as u64));
        if self.slice.size() > 0 {
            obj.insert("slice".into(), self.slice.to_json());
        }
        if self.structure {
            obj.insert("structure".into(), Value::Bool(true));
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, obj: &Map<String, Value>) -> Result<Step, StepJsonError> {
        let from = usize_field(obj, "from", "ReplaceAroundStep")?;
        let to = usize_field(obj, "to", "ReplaceAroundStep")?;
        let gap_from = usize_field(obj, "gapFrom", "ReplaceAroundStep")?;
        let gap_to = usize_field(obj, "gapTo", "ReplaceAroundStep")?;
        let insert = usize_field(obj, "insert", "ReplaceAroundStep")?;
        let slice = Slice::from_json(schema, obj.get("slice").unwrap_or(&Value::Null))?;
        let structure = obj
            .get("structure")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Step::ReplaceAround(ReplaceAroundStep::new(
            from, to, gap_from, gap_to, slice, insert, structure,
        )))
    }
}

/// Whether the range `from..to` contains anything but the closing and
/// opening tokens of nodes: used by structural steps to detect content
/// they would silently overwrite. Walks the unresolved distance token by
/// token, first up through closing tokens, then down through opening ones.
pub(crate) fn content_between(doc: &Node, from: usize, to: usize) -> bool {
    let rfrom = match doc.resolve(from) {
        Ok(rfrom) => rfrom,
        Err(_) => return true,
    };
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom
            .node(depth)
            .maybe_child(rfrom.index_after(depth))
            .cloned();
        while dist > 0 {
            match next {
                None => return true,
                Some(node) => {
                    if node.is_leaf() {
                        return true;
                    }
                    next = node.first_child().cloned();
                }
            }
            dist -= 1;
        }
    }
    false
}
