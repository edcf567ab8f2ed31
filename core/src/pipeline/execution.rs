// stepline/src/pipeline/execution.rs

//! Contains `Pipeline::run()`, which walks the plan and invokes the hooks.

use crate::core::context::{Handler, StepCall};
use crate::core::context_data::ContextData;
use crate::error::PipelineError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

impl Pipeline {
  /// Executes every step in order against `ctx_data`.
  ///
  /// Returns the number of steps that ran. The first failing hook stops the
  /// run: later hooks of that step and all later steps are never invoked, and
  /// the error comes back attributed to the failing step.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(num_steps = self.steps.len(), num_hooks = self.hook_count())
    )]
  pub async fn run(&self, ctx_data: ContextData) -> Result<usize, PipelineError> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step_execution",
        step_name = step.file_name.as_str(),
        step_index = step_idx,
        ordinal = %step.ordinal
      );

      let call = StepCall {
        index: step_idx,
        step: step.clone(),
      };

      let phases: [(&str, &[Handler]); 3] = [
        ("before", self.before.as_slice()),
        ("on", self.on.as_slice()),
        ("after", self.after.as_slice()),
      ];
      for (phase, handlers) in phases {
        for (handler_idx, handler_fn) in handlers.iter().enumerate() {
          let handler_span = span!(parent: &step_span, Level::DEBUG, "hook", phase, handler_index = handler_idx);
          if let Err(e) = handler_fn(ctx_data.clone(), call.clone()).instrument(handler_span).await {
            let e = e.attributed_to(&step.path);
            step_span.in_scope(|| event!(Level::DEBUG, phase, "Hook failed; aborting run."));
            return Err(e);
          }
        }
      }

      step_span.in_scope(|| event!(Level::DEBUG, "Step finished successfully."));
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(self.steps.len())
  }
}
