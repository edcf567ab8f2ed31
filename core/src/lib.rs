// stepline/src/lib.rs

//! Stepline: a fail-fast orchestrator for numbered report step programs.
//!
//! A report is a directory holding a TOML config and a folder of step
//! programs whose names end in a two-digit ordinal (`load_data_00.py`,
//! `create_excel_01.py`, ...). Stepline:
//!  - Discovers the steps, orders them by ordinal and narrows them to a
//!    start/end range.
//!  - Flattens the config into a parameter set and persists it, merged with
//!    whatever earlier steps wrote, before each step.
//!  - Runs each step as a child process with two arguments: the path of an
//!    opaque state artifact and the path of the parameter artifact.
//!  - Appends every step's output to a per-run log.
//!  - Stops at the first failing step and alerts an operator.

pub mod alert;
pub mod catalog;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod run_log;
pub mod runner;
pub mod settings;
pub mod state;

// --- Re-exports for the Public API ---

pub use crate::core::context::{Handler, StepCall};
pub use crate::core::context_data::{ContextData, RunContext, StepRecord};
pub use crate::core::control::{RunOutcome, RunPhase};
pub use crate::core::step::{Ordinal, Step};

pub use crate::pipeline::definition::Pipeline;

pub use crate::alert::{Alert, Alerter, CommandAlerter, LogAlerter};
pub use crate::coordinator::{resolve_plan, Coordinator, StepBounds};
pub use crate::params::{ParamStore, ParameterSet, CONFIG_PATH_KEY};
pub use crate::run_log::RunLog;
pub use crate::runner::{ExecutionResult, StepRunner};
pub use crate::settings::RunSettings;
pub use crate::state::{StateBlob, StateHandoff};

pub use crate::error::{PipelineError, PipelineResult};

/*
    Run lifecycle:
    1. Idle -> ResolvingSteps: build the ParameterSet from config/config.toml,
       list steps/ and filter by StepBounds. A missing config or an unmatched
       start step ends the run here.
    2. An empty plan ends the run as NothingToRun.
    3. Executing: for each step, `before` seeds the state artifact (first step
       only) and persists merged parameters, `on` runs the program, `after`
       collects the state artifact.
    4. Completed, or Aborted on the first failure: log, alert once, return
       the error.
*/
