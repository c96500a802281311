//! The step interface.
//!
//! A [`Step`] is an atomic, invertible document operation: applying it
//! either yields a new document or a failure value, never a panic, so
//! collaboration layers can uniformly observe success versus failure.
//! Steps can be mapped through position maps (rebasing), merged with an
//! adjacent step, and round-tripped through JSON.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use thiserror::Error;

use vellum_model::{ModelError, Node, ReplaceError, Schema, Slice};

use crate::map::{Mappable, StepMap};
use crate::mark_step::{AddMarkStep, RemoveMarkStep};
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::set_attrs_step::SetAttrsStep;

/// The failure branch of applying a step. Carries the stable message
/// string of the underlying model failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StepError(pub String);

impl From<ModelError> for StepError {
    fn from(err: ModelError) -> StepError {
        StepError(err.to_string())
    }
}

impl From<ReplaceError> for StepError {
    fn from(err: ReplaceError) -> StepError {
        StepError(err.to_string())
    }
}

/// The result of applying a step: the new document, or a failure message.
pub type StepResult = Result<Node, StepError>;

/// Apply a replace to `doc`, converting any model-level failure into a
/// step failure.
pub(crate) fn from_replace(doc: &Node, from: usize, to: usize, slice: &Slice) -> StepResult {
    doc.replace(from, to, slice).map_err(StepError::from)
}

/// Errors reported while decoding a step from JSON.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepJsonError {
    #[error("Invalid input for {0}.fromJSON")]
    InvalidInput(&'static str),
    #[error("No step {0} defined")]
    NoStepDefined(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A single document transform operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    AddMark(AddMarkStep),
    RemoveMark(RemoveMarkStep),
    SetAttrs(SetAttrsStep),
}

impl Step {
    /// Apply this step to the given document.
    pub fn apply(&self, doc: &Node) -> StepResult {
        match self {
            Step::Replace(step) => step.apply(doc),
            Step::ReplaceAround(step) => step.apply(doc),
            Step::AddMark(step) => step.apply(doc),
            Step::RemoveMark(step) => step.apply(doc),
            Step::SetAttrs(step) => step.apply(doc),
        }
    }

    /// The position map describing the length changes this step makes.
    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(step) => step.get_map(),
            Step::ReplaceAround(step) => step.get_map(),
            Step::AddMark(_) | Step::RemoveMark(_) | Step::SetAttrs(_) => StepMap::empty(),
        }
    }

    /// Create an inverted version of this step. `doc` must be the document
    /// this step was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        match self {
            Step::Replace(step) => step.invert(doc),
            Step::ReplaceAround(step) => step.invert(doc),
            Step::AddMark(step) => Ok(step.invert()),
            Step::RemoveMark(step) => Ok(step.invert()),
            Step::SetAttrs(step) => Ok(step.invert(doc)),
        }
    }

    /// Map this step through a mappable thing. `None` means the step was
    /// entirely deleted by the mapping.
    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        match self {
            Step::Replace(step) => step.map(mapping),
            Step::ReplaceAround(step) => step.map(mapping),
            Step::AddMark(step) => step.map(mapping),
            Step::RemoveMark(step) => step.map(mapping),
            Step::SetAttrs(step) => step.map(mapping),
        }
    }

    /// Try to merge this step with another one, to be applied directly
    /// after it.
    pub fn merge(&self, other: &Step) -> Option<Step> {
        match (self, other) {
            (Step::Replace(a), Step::Replace(b)) => a.merge(b),
            (Step::AddMark(a), Step::AddMark(b)) => a.merge(b),
            (Step::RemoveMark(a), Step::RemoveMark(b)) => a.merge(b),
            _ => None,
        }
    }

    /// Serialize this step to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Step::Replace(step) => step.to_json(),
            Step::ReplaceAround(step) => step.to_json(),
            Step::AddMark(step) => step.to_json(),
            Step::RemoveMark(step) => step.to_json(),
            Step::SetAttrs(step) => step.to_json(),
        }
    }

    /// Deserialize a step, dispatching on its `stepType` through the step
    /// registry.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Step, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::InvalidInput("Step"))?;
        let step_type = obj
            .get("stepType")
            .and_then(Value::as_str)
            .ok_or(StepJsonError::InvalidInput("Step"))?;
        let deserializer = {
            let registry = match STEP_REGISTRY.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.get(step_type).copied()
        };
        match deserializer {
            Some(deserialize) => deserialize(schema, obj),
            None => Err(StepJsonError::NoStepDefined(step_type.to_string())),
        }
    }
}

impl From<ReplaceStep> for Step {
    fn from(step: ReplaceStep) -> Step {
        Step::Replace(step)
    }
}

impl From<ReplaceAroundStep> for Step {
    fn from(step: ReplaceAroundStep) -> Step {
        Step::ReplaceAround(step)
    }
}

impl From<AddMarkStep> for Step {
    fn from(step: AddMarkStep) -> Step {
        Step::AddMark(step)
    }
}

impl From<RemoveMarkStep> for Step {
    fn from(step: RemoveMarkStep) -> Step {
        Step::RemoveMark(step)
    }
}

impl From<SetAttrsStep> for Step {
    fn from(step: SetAttrsStep) -> Step {
        Step::SetAttrs(step)
    }
}

/// A function that decodes one `stepType` into a step.
pub type StepDeserializer =
    fn(&Schema, &Map<String, Value>) -> Result<Step, StepJsonError>;

/// Some editor integrations emit a `tableSort` step that carries no
/// document change; decode it as a no-op replace so documents containing
/// it keep rebasing cleanly.
fn table_sort_from_json(_schema: &Schema, _obj: &Map<String, Value>) -> Result<Step, StepJsonError> {
    Ok(Step::Replace(ReplaceStep::new(0, 0, Slice::empty(), false)))
}

static STEP_REGISTRY: Lazy<RwLock<HashMap<String, StepDeserializer>>> = Lazy::new(|| {
    let mut registry: HashMap<String, StepDeserializer> = HashMap::new();
    registry.insert("replace".into(), ReplaceStep::from_json);
    registry.insert("replaceAround".into(), ReplaceAroundStep::from_json);
    registry.insert("addMark".into(), AddMarkStep::from_json);
    registry.insert("removeMark".into(), RemoveMarkStep::from_json);
    registry.insert("setAttrs".into(), SetAttrsStep::from_json);
    registry.insert("tableSort".into(), table_sort_from_json);
    RwLock::new(registry)
});

/// Register a deserializer for a custom `stepType`. The produced value
/// must still be one of the closed set of step variants.
pub fn register_step(step_type: &str, deserializer: StepDeserializer) {
    let mut registry = match STEP_REGISTRY.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    registry.insert(step_type.to_string(), deserializer);
}

pub(crate) fn usize_field(
    obj: &Map<String, Value>,
    key: &str,
    step: &'static str,
) -> Result<usize, StepJsonError> {
    obj.get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or(StepJsonError::InvalidInput(step))
}
