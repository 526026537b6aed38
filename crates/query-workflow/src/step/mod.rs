pub mod context;
pub mod trait_step;

pub use context::StepContext;
pub use trait_step::{StepError, StepOutput, StepResult, WorkflowStep};
