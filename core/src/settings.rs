// stepline/src/settings.rs

//! Knobs of a run that are not part of the report's own config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Layout and launch settings shared by the catalog, runner and coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
  /// Subdirectory of the report root holding the step programs.
  pub steps_dir: PathBuf,
  /// Report config, relative to the report root.
  pub config_file: PathBuf,
  /// Directory under which per-report log folders are created.
  /// Defaults to `<root parent>/logs`.
  pub log_root: Option<PathBuf>,
  /// Lowercased step extension to interpreter program.
  pub interpreters: BTreeMap<String, String>,
  pub state_file_name: String,
  pub params_file_name: String,
}

impl Default for RunSettings {
  fn default() -> Self {
    let mut interpreters = BTreeMap::new();
    interpreters.insert("py".to_string(), "python".to_string());
    interpreters.insert("sh".to_string(), "sh".to_string());
    Self {
      steps_dir: PathBuf::from("steps"),
      config_file: PathBuf::from("config").join("config.toml"),
      log_root: None,
      interpreters,
      state_file_name: "temp_state.bin".to_string(),
      params_file_name: "temp_params.json".to_string(),
    }
  }
}

impl RunSettings {
  pub fn with_steps_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.steps_dir = dir.into();
    self
  }

  pub fn with_log_root(mut self, dir: impl Into<PathBuf>) -> Self {
    self.log_root = Some(dir.into());
    self
  }

  pub fn with_interpreter(mut self, extension: &str, program: impl Into<String>) -> Self {
    self
      .interpreters
      .insert(extension.trim_start_matches('.').to_ascii_lowercase(), program.into());
    self
  }

  pub fn steps_path(&self, root: &Path) -> PathBuf {
    root.join(&self.steps_dir)
  }

  pub fn config_path(&self, root: &Path) -> PathBuf {
    root.join(&self.config_file)
  }

  pub fn state_path(&self, root: &Path) -> PathBuf {
    self.steps_path(root).join(&self.state_file_name)
  }

  pub fn params_path(&self, root: &Path) -> PathBuf {
    self.steps_path(root).join(&self.params_file_name)
  }

  pub fn log_root_for(&self, root: &Path) -> PathBuf {
    match &self.log_root {
      Some(dir) => dir.clone(),
      None => root.parent().unwrap_or(root).join("logs"),
    }
  }
}
