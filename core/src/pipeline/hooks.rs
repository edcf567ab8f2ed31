// stepline/src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` hooks. Every hook runs for
//! every step of the plan and receives the shared `ContextData` plus the
//! `StepCall` it is running for.

use crate::core::context::{Handler, StepCall};
use crate::core::context_data::ContextData;
use crate::error::PipelineError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;

impl Pipeline {
  /// Registers a hook run before each step's `on` phase.
  ///
  /// `UserErr` only has to convert into `PipelineError`, so hooks written
  /// against `anyhow::Result` work as-is.
  pub fn before_each<F, UserErr>(&mut self, hook: impl Fn(ContextData, StepCall) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<(), UserErr>> + Send + 'static,
    UserErr: Into<PipelineError> + Send + 'static,
  {
    self.before.push(wrap(hook));
  }

  /// Registers a hook for each step's main phase, typically running the step.
  pub fn on_each<F, UserErr>(&mut self, hook: impl Fn(ContextData, StepCall) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<(), UserErr>> + Send + 'static,
    UserErr: Into<PipelineError> + Send + 'static,
  {
    self.on.push(wrap(hook));
  }

  /// Registers a hook run after each step's `on` phase succeeded.
  pub fn after_each<F, UserErr>(&mut self, hook: impl Fn(ContextData, StepCall) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<(), UserErr>> + Send + 'static,
    UserErr: Into<PipelineError> + Send + 'static,
  {
    self.after.push(wrap(hook));
  }
}

fn wrap<F, UserErr>(hook: impl Fn(ContextData, StepCall) -> F + Send + Sync + 'static) -> Handler
where
  F: Future<Output = Result<(), UserErr>> + Send + 'static,
  UserErr: Into<PipelineError> + Send + 'static,
{
  Box::new(move |ctx, call| {
    let fut = hook(ctx, call);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}
