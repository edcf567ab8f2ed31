// stepline/src/coordinator.rs

//! The run coordinator: resolves the plan, wires the artifact hooks onto a
//! `Pipeline`, runs it fail-fast, and alerts the operator when a step fails.

use crate::alert::{self, Alert, Alerter};
use crate::catalog;
use crate::core::context::StepCall;
use crate::core::context_data::{ContextData, RunContext, StepRecord};
use crate::core::control::{RunOutcome, RunPhase};
use crate::core::step::Step;
use crate::error::{PipelineError, PipelineResult};
use crate::params::{self, ParamStore};
use crate::pipeline::Pipeline;
use crate::run_log::RunLog;
use crate::runner::StepRunner;
use crate::settings::RunSettings;
use crate::state::StateHandoff;
use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Inclusive ordinal range selecting which steps run. `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepBounds {
  pub start: Option<u64>,
  pub end: Option<u64>,
}

impl StepBounds {
  pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
    Self { start, end }
  }
}

/// Lists and filters the steps of the report at `root`.
pub fn resolve_plan(root: &Path, settings: &RunSettings, bounds: StepBounds) -> PipelineResult<Vec<Step>> {
  let steps = catalog::list_steps(&settings.steps_path(root), &settings.interpreters)?;
  catalog::filter(steps, bounds.start, bounds.end)
}

/// Whether `plan` begins at the first step of the catalog, i.e. the run is a
/// fresh one rather than a resume from a later step.
fn starts_at_beginning(catalog: &[Step], plan: &[Step]) -> bool {
  match (catalog.first(), plan.first()) {
    (Some(first), Some(planned)) => first.path == planned.path,
    _ => false,
  }
}

pub struct Coordinator {
  root: PathBuf,
  settings: RunSettings,
  log: RunLog,
  alerter: Arc<dyn Alerter>,
}

impl Coordinator {
  pub fn new(root: impl Into<PathBuf>, settings: RunSettings, log: RunLog, alerter: Arc<dyn Alerter>) -> Self {
    Self {
      root: root.into(),
      settings,
      log,
      alerter,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn log(&self) -> &RunLog {
    &self.log
  }

  /// Runs the selected steps of the report.
  ///
  /// Configuration and resolution problems are returned before any step
  /// starts, without alerting. A failing step aborts the run: the failure is
  /// written to the run log, the operator is alerted once, and the error is
  /// returned.
  #[instrument(
        name = "Coordinator::run",
        skip_all,
        fields(root = %self.root.display(), start = ?bounds.start, end = ?bounds.end),
        err(Display)
    )]
  pub async fn run(&self, bounds: StepBounds, extra_parameters: &[String]) -> PipelineResult<RunOutcome> {
    let mut phase = RunPhase::Idle;
    advance(&mut phase, RunPhase::ResolvingSteps);

    let config_path = self.settings.config_path(&self.root);
    let parameters = params::build(&config_path)?;
    let all_steps = catalog::list_steps(&self.settings.steps_path(&self.root), &self.settings.interpreters)?;
    let steps = catalog::filter(all_steps.clone(), bounds.start, bounds.end)?;

    event!(
      Level::INFO,
      root = %self.root.display(),
      start = ?bounds.start,
      end = ?bounds.end,
      extra = ?extra_parameters,
      parameters = ?parameters,
      "Starting run."
    );

    if steps.is_empty() {
      event!(Level::WARN, "No scripts found to execute.");
      advance(&mut phase, RunPhase::NothingToRun);
      return Ok(RunOutcome::NothingToRun);
    }

    // Only a fresh run drops parameters persisted by an earlier run.
    let params_path = self.settings.params_path(&self.root);
    if starts_at_beginning(&all_steps, &steps) {
      let removed = ParamStore::new(&params_path)
        .clear_stale()
        .map_err(|e| PipelineError::io(&params_path, e))?;
      if removed {
        event!(Level::DEBUG, path = %params_path.display(), "Removed parameter artifact left by an earlier run.");
      }
    } else {
      event!(Level::INFO, path = %params_path.display(), "Resuming; keeping persisted parameters.");
    }

    let ctx = ContextData::new(RunContext::new(
      self.root.clone(),
      self.settings.state_path(&self.root),
      params_path,
      parameters,
    ));
    let pipeline = self.build_pipeline(steps);

    advance(&mut phase, RunPhase::Executing);
    match pipeline.run(ctx).await {
      Ok(steps_run) => {
        advance(&mut phase, RunPhase::Completed);
        event!(Level::INFO, steps_run, "All selected steps completed.");
        Ok(RunOutcome::Completed { steps_run })
      }
      Err(e) => {
        advance(&mut phase, RunPhase::Aborted);
        self.abort(&e).await;
        Err(e)
      }
    }
  }

  /// Builds the pipeline for `steps` with the three artifact hooks:
  /// seed state and persist merged parameters, run the program, collect state.
  pub fn build_pipeline(&self, steps: Vec<Step>) -> Pipeline {
    let mut pipeline = Pipeline::new(steps);
    let handoff = StateHandoff::new(self.settings.state_path(&self.root));
    let store = ParamStore::new(self.settings.params_path(&self.root));
    let runner = Arc::new(StepRunner::new(self.settings.interpreters.clone(), self.log.clone()));

    let seed_handoff = handoff.clone();
    pipeline.before_each(move |ctx: ContextData, call: StepCall| {
      let handoff = seed_handoff.clone();
      let store = store.clone();
      async move {
        if call.is_first() {
          let initial = ctx.read().state.clone();
          handoff
            .write(&initial)
            .await
            .with_context(|| format!("seeding state artifact {}", handoff.path().display()))?;
        }
        let fresh = ctx.read().parameters.clone();
        let merged = store.persist_merged(fresh).await?;
        event!(Level::DEBUG, step = %call.step.path.display(), parameters = ?merged, "Running script with parameters.");
        ctx.write().parameters = merged;
        Ok::<(), anyhow::Error>(())
      }
    });

    pipeline.on_each(move |ctx: ContextData, call: StepCall| {
      let runner = runner.clone();
      async move {
        let (state_path, params_path) = {
          let guard = ctx.read();
          (guard.state_path.clone(), guard.params_path.clone())
        };
        let result = runner.run(&call.step, &state_path, &params_path).await?;
        ctx.write().executed.push(StepRecord { step: call.step, result });
        Ok::<(), PipelineError>(())
      }
    });

    pipeline.after_each(move |ctx: ContextData, call: StepCall| {
      let handoff = handoff.clone();
      async move {
        let collected = handoff
          .read()
          .await
          .with_context(|| format!("reading state artifact {}", handoff.path().display()))?;
        let mut guard = ctx.write();
        let updated = match collected {
          Some(blob) if blob != guard.state => {
            guard.state = blob;
            true
          }
          _ => false,
        };
        if let Some(record) = guard.executed.last_mut() {
          record.result.state_updated = updated;
        }
        event!(Level::INFO, step = %call.step.path.display(), state_updated = updated, "Step completed.");
        Ok::<(), anyhow::Error>(())
      }
    });

    pipeline
  }

  async fn abort(&self, err: &PipelineError) {
    let detail = match err {
      PipelineError::ScriptExecution { stdout, stderr, .. } => format!("{}\n{}\n{}", err, stdout, stderr),
      other => other.to_string(),
    };
    if let Err(e) = self.log.append_error(&detail).await {
      event!(Level::WARN, error = %e, log = %self.log.path().display(), "Could not record failure in run log.");
    }

    let alert = Alert {
      step: err
        .failed_step()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| self.root.clone()),
      log_path: self.log.path().to_path_buf(),
      message: err.to_string(),
    };
    alert::dispatch(self.alerter.as_ref(), &alert).await;
  }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
  if next.is_terminal() {
    event!(Level::INFO, from = %phase, to = %next, "Run finished.");
  } else {
    event!(Level::DEBUG, from = %phase, to = %next, "Run phase changed.");
  }
  *phase = next;
}
