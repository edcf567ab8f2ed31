// stepline-cli/src/main.rs

mod args;
mod config;
mod errors;
mod logging;

use crate::args::{Cli, Command, Target};
use crate::config::AppConfig;
use crate::errors::{CliError, Result as CliResult};
use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use stepline::{resolve_plan, Coordinator, RunLog, RunOutcome};

const NOTHING_TO_RUN: &str = "No scripts found to execute.";

#[tokio::main]
async fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      // Help and version go to stdout and are not failures.
      let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
      if e.print().is_err() {
        eprintln!("{}", e);
      }
      return code;
    }
  };

  match dispatch(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    // Pipeline errors were already logged by the coordinator.
    Err(e) => {
      eprintln!("stepline: {}", e);
      ExitCode::FAILURE
    }
  }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
  let app_config = AppConfig::from_env(cli.env_file.as_deref())?;
  match cli.command {
    Command::Run(target) => run(&app_config, target).await,
    Command::Plan(target) => plan(&app_config, target),
  }
}

async fn run(app_config: &AppConfig, target: Target) -> CliResult<()> {
  let settings = app_config.run_settings();
  let log_path = RunLog::path_for(&settings.log_root_for(&target.root), &target.root, &Local::now());
  let log = RunLog::create(&log_path).map_err(|source| CliError::RunLog { path: log_path, source })?;
  logging::init(Some(&log))?;
  tracing::info!(log = %log.path().display(), config = ?app_config, "Configuration loaded.");

  let alerter = app_config.alerter()?;
  let coordinator = Coordinator::new(&target.root, settings, log, alerter);
  match coordinator.run(target.bounds(), target.extra_parameters()).await? {
    RunOutcome::Completed { steps_run } => {
      tracing::info!(steps_run, log = %coordinator.log().path().display(), "Run completed.");
    }
    RunOutcome::NothingToRun => println!("{}", NOTHING_TO_RUN),
  }
  Ok(())
}

fn plan(app_config: &AppConfig, target: Target) -> CliResult<()> {
  logging::init(None)?;
  let settings = app_config.run_settings();
  let steps = resolve_plan(&target.root, &settings, target.bounds())?;
  if steps.is_empty() {
    println!("{}", NOTHING_TO_RUN);
    return Ok(());
  }
  for step in &steps {
    println!("{}\t{}", step.ordinal, step.path.display());
  }
  Ok(())
}
