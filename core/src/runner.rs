// stepline/src/runner.rs

//! The step runner: executes one step program as an isolated child process.

use crate::core::step::Step;
use crate::error::{PipelineError, PipelineResult};
use crate::run_log::RunLog;
use anyhow::Context as _;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{event, instrument, Level};

/// What one step invocation produced. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
  pub stdout: String,
  pub stderr: String,
  /// `None` when the child was terminated by a signal.
  pub exit_code: Option<i32>,
  /// Set once the state artifact has been collected after the step.
  pub state_updated: bool,
}

impl ExecutionResult {
  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }
}

/// Launches step programs and appends their output to the run log.
#[derive(Debug, Clone)]
pub struct StepRunner {
  interpreters: BTreeMap<String, String>,
  log: RunLog,
}

impl StepRunner {
  pub fn new(interpreters: BTreeMap<String, String>, log: RunLog) -> Self {
    Self { interpreters, log }
  }

  /// Program and leading arguments used to launch `step`: its interpreter if
  /// the extension is mapped, otherwise the step itself.
  pub fn launch_line(&self, step: &Step) -> (OsString, Vec<OsString>) {
    match step.extension().and_then(|ext| self.interpreters.get(&ext)) {
      Some(interpreter) => (OsString::from(interpreter), vec![step.path.clone().into_os_string()]),
      None => (step.path.clone().into_os_string(), Vec::new()),
    }
  }

  /// Runs `step` with the state and parameter artifact paths as its two
  /// positional arguments, in the step's own directory, with the parent's
  /// environment. Output is captured in full and appended to the run log
  /// whatever the outcome.
  #[instrument(
        name = "StepRunner::run",
        skip_all,
        fields(step = %step.file_name, ordinal = %step.ordinal)
    )]
  pub async fn run(&self, step: &Step, state_path: &Path, params_path: &Path) -> PipelineResult<ExecutionResult> {
    let (program, mut args) = self.launch_line(step);
    args.push(state_path.as_os_str().to_owned());
    args.push(params_path.as_os_str().to_owned());

    event!(Level::DEBUG, program = ?program, cwd = %step.working_dir().display(), "Spawning step program.");
    let output = Command::new(&program)
      .args(&args)
      .current_dir(step.working_dir())
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .output()
      .await
      .with_context(|| format!("failed to spawn {:?} for {}", program, step.path.display()))
      .map_err(|e| PipelineError::from(e).attributed_to(&step.path))?;

    let result = ExecutionResult {
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      exit_code: output.status.code(),
      state_updated: false,
    };

    self
      .log
      .append_step_output(&step.path, &result.stdout, &result.stderr)
      .await
      .with_context(|| format!("appending output to {}", self.log.path().display()))
      .map_err(|e| PipelineError::from(e).attributed_to(&step.path))?;

    if !result.success() {
      event!(Level::DEBUG, exit_code = ?result.exit_code, "Step program exited non-zero.");
      return Err(PipelineError::ScriptExecution {
        step: step.path.clone(),
        code: result.exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
      });
    }

    event!(Level::DEBUG, stdout_bytes = result.stdout.len(), "Step program exited cleanly.");
    Ok(result)
  }
}
