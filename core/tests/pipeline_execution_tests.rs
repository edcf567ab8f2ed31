// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use stepline::{ContextData, ParameterSet, Pipeline, PipelineError, RunContext, Step, StepCall};

fn steps(names: &[&str]) -> Vec<Step> {
  names
    .iter()
    .map(|n| Step::from_path(format!("/r/steps/{}", n)).unwrap())
    .collect()
}

fn context() -> ContextData {
  ContextData::new(RunContext::new(
    PathBuf::from("/r"),
    PathBuf::from("/r/steps/temp_state.bin"),
    PathBuf::from("/r/steps/temp_params.json"),
    ParameterSet::new(),
  ))
}

type Trace = Arc<Mutex<Vec<String>>>;

fn tracing_hook(
  trace: Trace,
  phase: &'static str,
) -> impl Fn(ContextData, StepCall) -> std::future::Ready<Result<(), PipelineError>> + Send + Sync + 'static {
  move |_ctx: ContextData, call: StepCall| {
    trace.lock().push(format!("{}:{}", phase, call.step.file_name));
    std::future::ready(Ok(()))
  }
}

#[tokio::test]
async fn test_pipeline_runs_steps_in_order_with_phases() {
  setup_tracing();
  let trace: Trace = Arc::default();
  let mut pipeline = Pipeline::new(steps(&["a_00.sh", "b_01.sh"]));
  pipeline.after_each(tracing_hook(trace.clone(), "after"));
  pipeline.on_each(tracing_hook(trace.clone(), "on"));
  pipeline.before_each(tracing_hook(trace.clone(), "before"));

  let ran = pipeline.run(context()).await.unwrap();

  assert_eq!(ran, 2);
  assert_eq!(
    *trace.lock(),
    vec![
      "before:a_00.sh",
      "on:a_00.sh",
      "after:a_00.sh",
      "before:b_01.sh",
      "on:b_01.sh",
      "after:b_01.sh",
    ]
  );
}

#[tokio::test]
async fn test_pipeline_stops_at_first_failing_hook() {
  setup_tracing();
  let trace: Trace = Arc::default();
  let mut pipeline = Pipeline::new(steps(&["a_00.sh", "b_01.sh", "c_02.sh"]));
  pipeline.on_each(tracing_hook(trace.clone(), "on"));
  pipeline.on_each(|_ctx: ContextData, call: StepCall| async move {
    if call.step.file_name == "b_01.sh" {
      anyhow::bail!("report query timed out");
    }
    Ok(())
  });
  pipeline.after_each(tracing_hook(trace.clone(), "after"));

  let err = pipeline.run(context()).await.unwrap_err();

  assert_eq!(*trace.lock(), vec!["on:a_00.sh", "after:a_00.sh", "on:b_01.sh"]);
  match err {
    PipelineError::Unexpected { step, source } => {
      assert_eq!(step, Some(PathBuf::from("/r/steps/b_01.sh")));
      assert_eq!(source.to_string(), "report query timed out");
    }
    other => panic!("Expected PipelineError::Unexpected, got {:?}", other),
  }
}

#[tokio::test]
async fn test_hooks_share_the_run_context() {
  setup_tracing();
  let mut pipeline = Pipeline::new(steps(&["a_00.sh", "b_01.sh", "c_02.sh"]));
  pipeline.on_each(|ctx: ContextData, call: StepCall| async move {
    let mut guard = ctx.write();
    let seen = guard.parameters.len().to_string();
    guard.parameters.insert(call.step.file_name.clone(), seen);
    Ok::<(), PipelineError>(())
  });

  let ctx = context();
  pipeline.run(ctx.clone()).await.unwrap();

  let snapshot = ctx.snapshot();
  assert_eq!(snapshot.parameters.get("a_00.sh"), Some("0"));
  assert_eq!(snapshot.parameters.get("b_01.sh"), Some("1"));
  assert_eq!(snapshot.parameters.get("c_02.sh"), Some("2"));
}

#[tokio::test]
async fn test_first_call_flag_is_set_once() {
  setup_tracing();
  let firsts = Arc::new(Mutex::new(Vec::new()));
  let seen = firsts.clone();
  let mut pipeline = Pipeline::new(steps(&["a_03.sh", "b_04.sh"]));
  pipeline.before_each(move |_ctx: ContextData, call: StepCall| {
    seen.lock().push((call.index, call.is_first()));
    async { Ok::<(), PipelineError>(()) }
  });

  pipeline.run(context()).await.unwrap();
  assert_eq!(*firsts.lock(), vec![(0, true), (1, false)]);
}

#[tokio::test]
async fn test_empty_pipeline_completes_without_hooks() {
  setup_tracing();
  let trace: Trace = Arc::default();
  let mut pipeline = Pipeline::new(Vec::new());
  pipeline.on_each(tracing_hook(trace.clone(), "on"));
  assert!(pipeline.is_empty());
  assert_eq!(pipeline.run(context()).await.unwrap(), 0);
  assert!(trace.lock().is_empty());
}
