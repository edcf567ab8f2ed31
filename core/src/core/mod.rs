pub mod context;
pub mod context_data;
pub mod control;
pub mod step;

pub use context::{Handler, StepCall};
pub use context_data::{ContextData, RunContext, StepRecord};
pub use control::{RunOutcome, RunPhase};
pub use step::{Ordinal, Step};
