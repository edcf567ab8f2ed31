// stepline-cli/src/config.rs

//! Operator configuration from the environment (and an optional dotenv file).

use crate::errors::{CliError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stepline::{Alerter, CommandAlerter, LogAlerter, RunSettings};

pub const STEPS_DIR_VAR: &str = "STEPLINE_STEPS_DIR";
pub const LOG_ROOT_VAR: &str = "STEPLINE_LOG_ROOT";
pub const ALERT_COMMAND_VAR: &str = "STEPLINE_ALERT_COMMAND";
pub const ALERT_FROM_VAR: &str = "STEPLINE_ALERT_FROM";
pub const ALERT_TO_VAR: &str = "STEPLINE_ALERT_TO";
pub const PYTHON_VAR: &str = "STEPLINE_PYTHON";

const DEFAULT_ALERT_FROM: &str = "stepline@localhost";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
  pub steps_dir: Option<PathBuf>,
  pub log_root: Option<PathBuf>,
  pub python: Option<String>,

  // Alerting. Without a command, alerts only go to the log.
  pub alert_command: Option<String>,
  pub alert_from: String,
  pub alert_to: Option<String>,
}

impl AppConfig {
  /// Loads `env_file` (or `.env` in the working directory, if present) and
  /// reads the `STEPLINE_*` variables.
  pub fn from_env(env_file: Option<&Path>) -> Result<Self> {
    match env_file {
      Some(path) => {
        dotenvy::from_path(path).map_err(|source| CliError::EnvFile {
          path: path.to_path_buf(),
          source,
        })?;
      }
      None => {
        dotenvy::dotenv().ok(); // Load .env file if present
      }
    }
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Builds the config from any variable source. Empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let config = Self {
      steps_dir: get(STEPS_DIR_VAR).map(PathBuf::from),
      log_root: get(LOG_ROOT_VAR).map(PathBuf::from),
      python: get(PYTHON_VAR),
      alert_command: get(ALERT_COMMAND_VAR),
      alert_from: get(ALERT_FROM_VAR).unwrap_or_else(|| DEFAULT_ALERT_FROM.to_string()),
      alert_to: get(ALERT_TO_VAR),
    };

    if config.alert_command.is_some() && config.alert_to.is_none() {
      return Err(CliError::Config(format!(
        "{} is required when {} is set",
        ALERT_TO_VAR, ALERT_COMMAND_VAR
      )));
    }
    Ok(config)
  }

  pub fn run_settings(&self) -> RunSettings {
    let mut settings = RunSettings::default();
    if let Some(dir) = &self.steps_dir {
      settings = settings.with_steps_dir(dir);
    }
    if let Some(dir) = &self.log_root {
      settings = settings.with_log_root(dir);
    }
    if let Some(python) = &self.python {
      settings = settings.with_interpreter("py", python.as_str());
    }
    settings
  }

  pub fn alerter(&self) -> Result<Arc<dyn Alerter>> {
    let (Some(command), Some(to)) = (&self.alert_command, &self.alert_to) else {
      return Ok(Arc::new(LogAlerter));
    };
    let alerter = CommandAlerter::from_command_line(command, self.alert_from.as_str(), to.as_str())
      .ok_or_else(|| CliError::Config(format!("{} has no program to run", ALERT_COMMAND_VAR)))?;
    Ok(Arc::new(alerter))
  }
}
