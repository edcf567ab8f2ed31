// stepline/src/core/control.rs

//! Run lifecycle phases and the outcome of a run that did not abort.

use std::fmt;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
  Idle,
  ResolvingSteps,
  Executing,
  Completed,
  /// Nothing qualified after filtering. Terminal, not an error.
  NothingToRun,
  /// A step failed; remaining steps were not run.
  Aborted,
}

impl RunPhase {
  pub fn is_terminal(&self) -> bool {
    matches!(self, RunPhase::Completed | RunPhase::NothingToRun | RunPhase::Aborted)
  }
}

impl fmt::Display for RunPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RunPhase::Idle => "idle",
      RunPhase::ResolvingSteps => "resolving_steps",
      RunPhase::Executing => "executing",
      RunPhase::Completed => "completed",
      RunPhase::NothingToRun => "nothing_to_run",
      RunPhase::Aborted => "aborted",
    };
    f.write_str(name)
  }
}

/// Outcome of a run that did not abort. Aborts surface as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  /// Every selected step exited successfully.
  Completed { steps_run: usize },
  /// The filtered plan was empty.
  NothingToRun,
}
