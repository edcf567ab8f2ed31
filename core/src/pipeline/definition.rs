// stepline/src/pipeline/definition.rs

//! Contains the `Pipeline` struct: an ordered plan of steps plus the hooks
//! invoked for each of them.

use crate::core::context::Handler;
use crate::core::step::Step;

/// An ordered plan of step programs and the `before`/`on`/`after` hooks run
/// for every step in it.
///
/// Hooks of one phase run in registration order. Steps run strictly one
/// after another; the first hook error ends the run.
pub struct Pipeline {
  /// Steps in execution order.
  pub(crate) steps: Vec<Step>,

  pub(crate) before: Vec<Handler>,
  pub(crate) on: Vec<Handler>,
  pub(crate) after: Vec<Handler>,
}

impl Pipeline {
  /// Creates a pipeline over an already ordered plan.
  pub fn new(steps: Vec<Step>) -> Self {
    Self {
      steps,
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Number of hooks registered across all phases.
  pub fn hook_count(&self) -> usize {
    self.before.len() + self.on.len() + self.after.len()
  }
}

impl std::fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("steps", &self.steps.iter().map(|s| s.file_name.as_str()).collect::<Vec<_>>())
      .field("before_hooks", &self.before.len())
      .field("on_hooks", &self.on.len())
      .field("after_hooks", &self.after.len())
      .finish()
  }
}
