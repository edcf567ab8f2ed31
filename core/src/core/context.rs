// stepline/src/core/context.rs

//! Defines the `Handler` type for pipeline hooks and the per-invocation
//! `StepCall` they receive.

use crate::core::context_data::ContextData;
use crate::core::step::Step;
use crate::error::PipelineError;
use std::future::Future;
use std::pin::Pin;

/// The step a hook is being invoked for.
#[derive(Debug, Clone)]
pub struct StepCall {
  /// Position in the run's plan, starting at 0.
  pub index: usize,
  pub step: Step,
}

impl StepCall {
  pub fn is_first(&self) -> bool {
    self.index == 0
  }
}

/// Type alias for a pipeline hook.
///
/// A hook receives a clone of the shared `ContextData` and the `StepCall`,
/// and resolves to `Ok(())` to let the step proceed or an error to abort
/// the run. Hooks must drop lock guards before awaiting.
pub type Handler = Box<
  dyn Fn(ContextData, StepCall) -> Pin<Box<dyn Future<Output = Result<(), PipelineError>> + Send>>
    + Send
    + Sync,
>;
