// stepline/src/run_log.rs

//! The per-run log file. Append-only and human-readable; step output is
//! written here verbatim, and the CLI points a tracing layer at the same file.

use chrono::{DateTime, TimeZone};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct RunLog {
  path: PathBuf,
}

impl RunLog {
  /// `<log_root>/<report dir name>/log_<YYYYmmdd_HHMMSS>.txt`
  pub fn path_for<Tz: TimeZone>(log_root: &Path, root: &Path, started_at: &DateTime<Tz>) -> PathBuf
  where
    Tz::Offset: std::fmt::Display,
  {
    let report = root
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "report".to_string());
    log_root
      .join(report)
      .join(format!("log_{}.txt", started_at.format("%Y%m%d_%H%M%S")))
  }

  /// Creates the log directory and the (possibly pre-existing) log file.
  pub fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
    let path = path.into();
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(Self { path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// A blocking append handle, for tracing writers.
  pub fn open_append(&self) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(&self.path)
  }

  /// Appends the captured output of one step under a header naming it.
  pub async fn append_step_output(&self, step: &Path, stdout: &str, stderr: &str) -> std::io::Result<()> {
    let mut block = String::with_capacity(stdout.len() + stderr.len() + 64);
    block.push_str(&format!("Output of {}:\n", step.display()));
    block.push_str(stdout);
    block.push_str(stderr);
    block.push_str("\n\n");
    self.append(&block).await
  }

  /// Appends a failure description followed by a blank line.
  pub async fn append_error(&self, message: &str) -> std::io::Result<()> {
    self.append(&format!("{}\n\n", message)).await
  }

  async fn append(&self, text: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await
  }
}
