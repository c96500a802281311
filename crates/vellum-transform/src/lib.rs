//! Document transforms for the vellum editor core.
//!
//! Changes to a document are expressed as first-class step values which
//! can be saved, exchanged between collaborating peers, inverted, and
//! rebased through position maps.

pub mod map;
pub mod mark_step;
pub mod replace_step;
pub mod set_attrs_step;
pub mod step;

pub use map::{MapResult, Mappable, Mapping, StepMap};
pub use mark_step::{AddMarkStep, RemoveMarkStep};
pub use replace_step::{ReplaceAroundStep, ReplaceStep};
pub use set_attrs_step::SetAttrsStep;
pub use step::{register_step, Step, StepDeserializer, StepError, StepJsonError, StepResult};
