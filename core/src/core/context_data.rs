// stepline/src/core/context_data.rs
use crate::core::step::Step;
use crate::params::ParameterSet;
use crate::runner::ExecutionResult;
use crate::state::StateBlob;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a run carries from step to step.
///
/// The artifact paths never change during a run; `parameters` and `state`
/// are replaced as steps persist new values.
#[derive(Debug, Clone)]
pub struct RunContext {
  pub root: PathBuf,
  pub state_path: PathBuf,
  pub params_path: PathBuf,
  /// Defaults handed to the next step, merged under the persisted artifact.
  pub parameters: ParameterSet,
  /// Last state collected from the artifact (or the initial sentinel).
  pub state: StateBlob,
  /// One record per step that finished, in execution order.
  pub executed: Vec<StepRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
  pub step: Step,
  pub result: ExecutionResult,
}

impl RunContext {
  pub fn new(root: PathBuf, state_path: PathBuf, params_path: PathBuf, parameters: ParameterSet) -> Self {
    Self {
      root,
      state_path,
      params_path,
      parameters,
      state: StateBlob::empty(),
      executed: Vec::new(),
    }
  }
}

/// Shared handle to the run context, cloned into every hook.
///
/// Lock guards are blocking and MUST NOT be held across `.await` points.
#[derive(Debug)]
pub struct ContextData(Arc<RwLock<RunContext>>);

impl ContextData {
  pub fn new(ctx: RunContext) -> Self {
    ContextData(Arc::new(RwLock::new(ctx)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, RunContext> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, RunContext> {
    self.0.write()
  }

  /// Copies the context out, e.g. for reporting after the run.
  pub fn snapshot(&self) -> RunContext {
    self.0.read().clone()
  }
}

impl Clone for ContextData {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}
