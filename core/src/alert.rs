// stepline/src/alert.rs

//! Operator alerting when a run aborts.
//!
//! The coordinator raises exactly one [`Alert`] per aborted run through an
//! [`Alerter`]. Delivery is fire-and-forget: a channel failure is logged and
//! never replaces the pipeline error that caused the alert.

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{event, Level};

/// What the operator is told about a failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
  pub step: PathBuf,
  pub log_path: PathBuf,
  pub message: String,
}

impl Alert {
  pub fn step_name(&self) -> String {
    self
      .step
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.step.display().to_string())
  }

  pub fn subject(&self) -> String {
    format!("FATAL ERROR: {} HAS ENCOUNTERED A FATAL ERROR", self.step_name())
  }

  pub fn body(&self) -> String {
    format!("Log file path: {}\n\n{}\n", self.log_path.display(), self.message)
  }
}

/// A notification channel.
#[async_trait]
pub trait Alerter: Send + Sync {
  async fn notify(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Sends `alert` once. Errors are logged as warnings and swallowed.
pub async fn dispatch(alerter: &dyn Alerter, alert: &Alert) {
  event!(Level::INFO, step = %alert.step.display(), "Alerting operator.");
  if let Err(e) = alerter.notify(alert).await {
    event!(Level::WARN, error = %format!("{:#}", e), "Alert delivery failed.");
  }
}

/// Reports alerts through tracing only. Used when no channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
  async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
    event!(
      Level::ERROR,
      step = %alert.step.display(),
      log = %alert.log_path.display(),
      "{}: {}",
      alert.subject(),
      alert.message
    );
    Ok(())
  }
}

/// Pipes a mail message to a sendmail-style command on stdin.
///
/// The message carries `From`, `To` and `Subject` headers, a blank line and
/// the alert body, which is what `sendmail -t` and friends expect.
///
/// A command that has not finished within the timeout is killed.
#[derive(Debug, Clone)]
pub struct CommandAlerter {
  program: PathBuf,
  args: Vec<String>,
  from: String,
  to: String,
  timeout: Duration,
}

impl CommandAlerter {
  pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

  pub fn new(program: impl Into<PathBuf>, args: Vec<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args,
      from: from.into(),
      to: to.into(),
      timeout: Self::DEFAULT_TIMEOUT,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Builds from a whitespace separated command line such as `sendmail -t`.
  pub fn from_command_line(command: &str, from: impl Into<String>, to: impl Into<String>) -> Option<Self> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some(Self::new(program, parts.collect(), from, to))
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  pub fn message(&self, alert: &Alert) -> String {
    format!(
      "From: {}\nTo: {}\nSubject: {}\n\n{}",
      self.from,
      self.to,
      alert.subject(),
      alert.body()
    )
  }
}

#[async_trait]
impl Alerter for CommandAlerter {
  async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
    match tokio::time::timeout(self.timeout, self.deliver(alert)).await {
      Ok(result) => result,
      Err(_) => bail!(
        "alert command {} did not finish within {:?} and was killed",
        self.program.display(),
        self.timeout
      ),
    }
  }
}

impl CommandAlerter {
  // The child is killed whenever this future is dropped before it exits,
  // including on timeout or a failed write.
  async fn deliver(&self, alert: &Alert) -> anyhow::Result<()> {
    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::null())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .with_context(|| format!("spawning alert command {}", self.program.display()))?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(self.message(alert).as_bytes())
        .await
        .with_context(|| format!("writing to alert command {}", self.program.display()))?;
      // dropping stdin closes the pipe so the command sees EOF
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
      bail!(
        "alert command {} exited with {}: {}",
        self.program.display(),
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
      );
    }
    event!(Level::DEBUG, to = %self.to, "Alert handed to mail command.");
    Ok(())
  }
}
