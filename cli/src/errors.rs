// stepline-cli/src/errors.rs

use std::path::PathBuf;
use stepline::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Could not load env file {}: {source}", path.display())]
  EnvFile {
    path: PathBuf,
    #[source]
    source: dotenvy::Error,
  },

  #[error("Could not create run log {}: {source}", path.display())]
  RunLog {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Logging setup failed: {0}")]
  Logging(String),

  #[error(transparent)]
  Pipeline(#[from] PipelineError),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;
