// stepline/src/error.rs
use anyhow::Error as AnyhowError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
  /// Required configuration is missing or unreadable. The run never starts.
  #[error("Configuration error ({}): {message}", path.display())]
  Config { path: PathBuf, message: String },

  /// The requested start step has no match in the catalog.
  #[error("No script found for starting step {start}")]
  StepResolution { start: u64 },

  /// A step program exited with a non-zero status (or was killed by a signal).
  #[error("Error running {}: {}", step.display(), describe_exit(*code))]
  ScriptExecution {
    step: PathBuf,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  /// Anything else that went wrong while orchestrating a step: spawn failures,
  /// artifact I/O, a corrupt parameter artifact.
  #[error("Unexpected error running {}: {source}", step_label(step.as_deref()))]
  Unexpected {
    step: Option<PathBuf>,
    #[source]
    source: AnyhowError,
  },

  /// Run-level I/O outside of any step (log directory, stale artifacts).
  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl PipelineError {
  pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    PipelineError::Config {
      path: path.into(),
      message: message.into(),
    }
  }

  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    PipelineError::Io {
      path: path.into(),
      source,
    }
  }

  /// True for the failures that happen while a step is being executed.
  /// These abort the run and page the operator; the others are fatal before
  /// any step starts.
  pub fn is_step_failure(&self) -> bool {
    matches!(
      self,
      PipelineError::ScriptExecution { .. } | PipelineError::Unexpected { .. }
    )
  }

  /// The step program this error is attributed to, if any.
  pub fn failed_step(&self) -> Option<&Path> {
    match self {
      PipelineError::ScriptExecution { step, .. } => Some(step),
      PipelineError::Unexpected { step, .. } => step.as_deref(),
      _ => None,
    }
  }

  /// Attributes an `Unexpected` error raised without step context to `step`.
  /// Other variants are returned as-is.
  pub(crate) fn attributed_to(self, step: &Path) -> Self {
    match self {
      PipelineError::Unexpected { step: None, source } => PipelineError::Unexpected {
        step: Some(step.to_path_buf()),
        source,
      },
      other => other,
    }
  }
}

// Hooks use `?` on anyhow results; those become step-level unexpected errors
// and the pipeline fills in the step afterwards.
impl From<AnyhowError> for PipelineError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<PipelineError>() {
      Ok(pipeline_err) => pipeline_err,
      Err(err) => PipelineError::Unexpected { step: None, source: err },
    }
  }
}

fn describe_exit(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("returned non-zero exit status {}", code),
    None => "terminated by signal".to_string(),
  }
}

fn step_label(step: Option<&Path>) -> String {
  step.map_or_else(|| "<run>".to_string(), |p| p.display().to_string())
}

pub type PipelineResult<T, E = PipelineError> = std::result::Result<T, E>;
