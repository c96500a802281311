//! A step that changes the attributes of a single node.

use serde_json::{Map, Value};

use vellum_model::{Attrs, Fragment, Node, Schema, Slice};

use crate::map::Mappable;
use crate::step::{from_replace, usize_field, Step, StepError, StepJsonError, StepResult};

/// Overwrites some of the attributes of the node at `pos`, leaving the
/// node's content in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAttrsStep {
    pub pos: usize,
    pub attrs: Attrs,
}

impl SetAttrsStep {
    pub fn new(pos: usize, attrs: Attrs) -> SetAttrsStep {
        SetAttrsStep { pos, attrs }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        let target = doc
            .node_at(self.pos)
            .ok_or_else(|| StepError("No node at given position".into()))?;

        let mut attrs = target.attrs().clone();
        for (key, value) in &self.attrs {
            attrs.insert(key.clone(), value.clone());
        }

        let new_node = target
            .node_type()
            .create(Some(&attrs), Fragment::empty(), target.marks())
            .map_err(StepError::from)?;
        // An open end lets the emptied replacement node rejoin the
        // target's existing content.
        let open_end = if target.is_leaf() { 0 } else { 1 };
        let slice = Slice::new(Fragment::from_node(new_node), 0, open_end);
        from_replace(doc, self.pos, self.pos + 1, &slice)
    }

    /// The inverse records the attributes the node carried before this
    /// step.
    pub fn invert(&self, doc: &Node) -> Step {
        let attrs = doc
            .node_at(self.pos)
            .map(|node| node.attrs().clone())
            .unwrap_or_default();
        Step::SetAttrs(SetAttrsStep::new(self.pos, attrs))
    }

    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let result = mapping.map_result(self.pos, 1);
        if result.deleted {
            return None;
        }
        Some(Step::SetAttrs(SetAttrsStep::new(
            result.pos,
            self.attrs.clone(),
        )))
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("setAttrs".into()));
        obj.insert("pos".into(), Value::from(self.pos as u64));
        obj.insert("attrs".into(), Value::Object(self.attrs.clone()));
        Value::Object(obj)
    }

    pub fn from_json(_schema: &Schema, obj: &Map<String, Value>) -> Result<Step, StepJsonError> {
        let attrs = match obj.get("attrs") {
            Some(Value::Object(attrs)) => attrs.clone(),
            _ => return Err(StepJsonError::InvalidInput("SetAttrsStep")),
        };
        let pos = usize_field(obj, "pos", "SetAttrsStep")?;
        Ok(Step::SetAttrs(SetAttrsStep::new(pos, attrs)))
    }
}
