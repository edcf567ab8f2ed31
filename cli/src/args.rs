// stepline-cli/src/args.rs

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stepline::StepBounds;

/// Run numbered report step programs in order, stopping at the first failure.
///
/// Examples:
///   stepline run /reports/sdoh              # Run every step
///   stepline run /reports/sdoh 5            # Start at the first step numbered 5 or more
///   stepline run /reports/sdoh 0 3          # Run steps 00 through 03
///   stepline plan /reports/sdoh 5           # Show what `run` would execute
#[derive(Debug, Parser)]
#[command(name = "stepline")]
#[command(version)]
#[command(about = "Run numbered report step programs in order, stopping at the first failure")]
pub struct Cli {
  /// Dotenv file to load before reading STEPLINE_* variables (default: ./.env if present).
  #[arg(long, global = true, value_name = "PATH")]
  pub env_file: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Run the selected steps of a report.
  Run(Target),
  /// Print the steps `run` would execute, without running them.
  Plan(Target),
}

#[derive(Debug, Args)]
pub struct Target {
  /// Report directory holding config/config.toml and the steps folder.
  #[arg(value_name = "ROOT_DIRECTORY", value_parser = existing_dir)]
  pub root: PathBuf,

  /// [START_STEP] [END_STEP] [EXTRA_PARAMETERS]...
  ///
  /// A step slot is a bound only when it is all digits; any other value
  /// leaves that side unbounded.
  #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
  pub rest: Vec<String>,
}

impl Target {
  pub fn bounds(&self) -> StepBounds {
    StepBounds::new(self.slot(0), self.slot(1))
  }

  pub fn extra_parameters(&self) -> &[String] {
    self.rest.get(2..).unwrap_or(&[])
  }

  fn slot(&self, idx: usize) -> Option<u64> {
    self.rest.get(idx).and_then(|raw| step_number(raw))
  }
}

/// Parses a start/end slot: all ASCII digits, fitting in a `u64`.
pub fn step_number(raw: &str) -> Option<u64> {
  if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  raw.parse().ok()
}

fn existing_dir(raw: &str) -> Result<PathBuf, String> {
  let path = PathBuf::from(raw);
  if !path.is_dir() {
    return Err(format!("'{}' is not an existing directory", raw));
  }
  path
    .canonicalize()
    .map_err(|e| format!("cannot resolve '{}': {}", raw, e))
}
