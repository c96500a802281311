//! Steps that add or remove a mark across a range.

use serde_json::{Map, Value};

use vellum_model::{Fragment, Mark, Node, Schema, Slice};

use crate::map::Mappable;
use crate::step::{from_replace, usize_field, Step, StepError, StepJsonError, StepResult};

fn map_fragment(fragment: &Fragment, f: &dyn Fn(&Node, &Node) -> Node, parent: &Node) -> Fragment {
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment.iter() {
        let mut child = child.clone();
        if child.content().size() > 0 {
            let inner = map_fragment(child.content(), f, &child);
            child = child.copy(inner);
        }
        if child.is_inline() {
            child = f(&child, parent);
        }
        mapped.push(child);
    }
    Fragment::from_nodes(mapped)
}

/// Adds a mark to all inline content between two positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

impl AddMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> AddMarkStep {
        AddMarkStep { from, to, mark }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        let old_slice = doc
            .slice(self.from, self.to, false)
            .map_err(StepError::from)?;
        let rfrom = doc.resolve(self.from).map_err(StepError::from)?;
        let parent = rfrom.node(rfrom.shared_depth(self.to)).clone();
        let mark = &self.mark;
        let fragment = map_fragment(
            old_slice.content(),
            &|node, parent| {
                if !parent.node_type().allows_mark_type(mark.mark_type()) {
                    return node.clone();
                }
                node.mark(mark.add_to_set(node.marks()))
            },
            &parent,
        );
        let slice = Slice::new(fragment, old_slice.open_start(), old_slice.open_end());
        from_replace(doc, self.from, self.to, &slice)
    }

    pub fn invert(&self) -> Step {
        Step::RemoveMark(RemoveMarkStep::new(self.from, self.to, self.mark.clone()))
    }

    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if (from.deleted && to.deleted) || from.pos >= to.pos {
            return None;
        }
        Some(Step::AddMark(AddMarkStep::new(
            from.pos,
            to.pos,
            self.mark.clone(),
        )))
    }

    /// Two additions of the same mark merge when their ranges touch or
    /// overlap, producing a single step over the union.
    pub fn merge(&self, other: &AddMarkStep) -> Option<Step> {
        if self.mark == other.mark && self.from <= other.to && self.to >= other.from {
            return Some(Step::AddMark(AddMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            )));
        }
        None
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("addMark".into()));
        obj.insert("mark".into(), self.mark.to_json());
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, obj: &Map<String, Value>) -> Result<Step, StepJsonError> {
        let from = usize_field(obj, "from", "AddMarkStep")?;
        let to = usize_field(obj, "to", "AddMarkStep")?;
        let mark = Mark::from_json(schema, obj.get("mark").unwrap_or(&Value::Null))?;
        Ok(Step::AddMark(AddMarkStep::new(from, to, mark)))
    }
}

/// Removes a mark from all inline content between two positions.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

impl RemoveMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> RemoveMarkStep {
        RemoveMarkStep { from, to, mark }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        let old_slice = doc
            .slice(self.from, self.to, false)
            .map_err(StepError::from)?;
        let rfrom = doc.resolve(self.from).map_err(StepError::from)?;
        let parent = rfrom.node(rfrom.shared_depth(self.to)).clone();
        let mark = &self.mark;
        let fragment = map_fragment(
            old_slice.content(),
            &|node, _| node.mark(mark.remove_from_set(node.marks())),
            &parent,
        );
        let slice = Slice::new(fragment, old_slice.open_start(), old_slice.open_end());
        from_replace(doc, self.from, self.to, &slice)
    }

    pub fn invert(&self) -> Step {
        Step::AddMark(AddMarkStep::new(self.from, self.to, self.mark.clone()))
    }

    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if (from.deleted && to.deleted) || from.pos >= to.pos {
            return None;
        }
        Some(Step::RemoveMark(RemoveMarkStep::new(
            from.pos,
            to.pos,
            self.mark.clone(),
        )))
    }

    pub fn merge(&self, other: &RemoveMarkStep) -> Option<Step> {
        if self.mark == other.mark && self.from <= other.to && self.to >= other.from {
            return Some(Step::RemoveMark(RemoveMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            )));
        }
        None
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("removeMark".into()));
        obj.insert("mark".into(), self.mark.to_json());
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, obj: &Map<String, Value>) -> Result<Step, StepJsonError> {
        let from = usize_field(obj, "from", "RemoveMarkStep")?;
        let to = usize_field(obj, "to", "RemoveMarkStep")?;
        let mark = Mark::from_json(schema, obj.get("mark").unwrap_or(&Value::Null))?;
        Ok(Step::RemoveMark(RemoveMarkStep::new(from, to, mark)))
    }
}
