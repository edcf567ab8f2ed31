// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stepline::{Alert, Alerter, Coordinator, RunLog, RunSettings};
use tempfile::TempDir;
use tracing::Level;

// --- Helper for Tracing Setup ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub const DEFAULT_CONFIG: &str = r#"
[database]
server = "db01"
start_date = "2024-01-01"

[email]
to_email = "reports@example.org"
"#;

// --- Report fixture ---

/// A throwaway report directory: `<tmp>/reports/<name>/{config,steps}`, with
/// logs going to `<tmp>/logs`. Steps are `sh` scripts; each one appends its
/// file name to `<root>/trace.txt` so tests can see what ran.
pub struct ReportFixture {
  _tmp: TempDir,
  pub root: PathBuf,
  pub log_root: PathBuf,
}

impl ReportFixture {
  pub fn new(name: &str) -> Self {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("reports").join(name);
    std::fs::create_dir_all(root.join("steps")).unwrap();
    std::fs::create_dir_all(root.join("config")).unwrap();
    let log_root = tmp.path().join("logs");
    let fixture = Self {
      _tmp: tmp,
      root,
      log_root,
    };
    fixture.write_config(DEFAULT_CONFIG);
    fixture
  }

  pub fn write_config(&self, toml: &str) {
    std::fs::write(self.root.join("config").join("config.toml"), toml).unwrap();
  }

  pub fn remove_config(&self) {
    std::fs::remove_file(self.root.join("config").join("config.toml")).unwrap();
  }

  /// Adds a step program. `body` runs after the trace line is written.
  pub fn add_step(&self, file_name: &str, body: &str) -> PathBuf {
    let path = self.steps_dir().join(file_name);
    let script = format!("echo {name} >> ../trace.txt\n{body}\n", name = file_name, body = body);
    std::fs::write(&path, script).unwrap();
    path
  }

  pub fn steps_dir(&self) -> PathBuf {
    self.root.join("steps")
  }

  pub fn settings(&self) -> RunSettings {
    RunSettings::default().with_log_root(&self.log_root)
  }

  pub fn log_path(&self) -> PathBuf {
    self.log_root.join(self.root.file_name().unwrap()).join("log_test.txt")
  }

  pub fn coordinator(&self, alerter: Arc<dyn Alerter>) -> Coordinator {
    self.coordinator_with(self.settings(), alerter)
  }

  pub fn coordinator_with(&self, settings: RunSettings, alerter: Arc<dyn Alerter>) -> Coordinator {
    let log = RunLog::create(self.log_path()).unwrap();
    Coordinator::new(&self.root, settings, log, alerter)
  }

  /// File names of the steps that ran, in order.
  pub fn trace(&self) -> Vec<String> {
    match std::fs::read_to_string(self.root.join("trace.txt")) {
      Ok(text) => text.lines().map(str::to_string).collect(),
      Err(_) => Vec::new(),
    }
  }

  pub fn log_text(&self) -> String {
    std::fs::read_to_string(self.log_path()).unwrap_or_default()
  }

  pub fn read_root_file(&self, name: &str) -> Vec<u8> {
    std::fs::read(self.root.join(name)).unwrap()
  }

  pub fn root_file_exists(&self, name: &str) -> bool {
    self.root.join(name).exists()
  }
}

pub fn file_name(path: &Path) -> String {
  path.file_name().unwrap().to_string_lossy().into_owned()
}

// --- Alerters ---

#[derive(Default)]
pub struct RecordingAlerter {
  pub alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerter {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn taken(&self) -> Vec<Alert> {
    self.alerts.lock().clone()
  }
}

#[async_trait]
impl Alerter for RecordingAlerter {
  async fn notify(&self, alert: &Alert) -> anyhow::Result<()> {
    self.alerts.lock().push(alert.clone());
    Ok(())
  }
}

/// Records the attempt, then fails like an unreachable mail server.
#[derive(Default)]
pub struct BrokenAlerter {
  pub attempts: Mutex<usize>,
}

#[async_trait]
impl Alerter for BrokenAlerter {
  async fn notify(&self, _alert: &Alert) -> anyhow::Result<()> {
    *self.attempts.lock() += 1;
    anyhow::bail!("smtp connection refused")
  }
}
