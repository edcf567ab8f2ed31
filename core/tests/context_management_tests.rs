// tests/context_management_tests.rs
mod common;

use common::*;
use stepline::{ParamStore, ParameterSet, RunOutcome, StepBounds, CONFIG_PATH_KEY};

#[tokio::test]
async fn test_state_passes_byte_identical_between_steps() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  report.add_step("a_00.sh", "cp \"$1\" ../state_seen_by_0.bin\nprintf 'blob-v1' > \"$1\"");
  report.add_step("b_01.sh", "cp \"$1\" ../state_seen_by_1.bin");
  report.add_step("c_02.sh", "cp \"$1\" ../state_seen_by_2.bin");

  let outcome = report
    .coordinator(RecordingAlerter::new())
    .run(StepBounds::default(), &[])
    .await
    .unwrap();

  assert_eq!(outcome, RunOutcome::Completed { steps_run: 3 });
  assert!(report.read_root_file("state_seen_by_0.bin").is_empty());
  assert_eq!(report.read_root_file("state_seen_by_1.bin"), b"blob-v1");
  assert_eq!(report.read_root_file("state_seen_by_2.bin"), b"blob-v1");
}

#[tokio::test]
async fn test_state_is_carried_forward_when_artifact_is_removed() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  let steps = vec![
    report.add_step("a_00.sh", "printf 'blob-v1' > \"$1\""),
    report.add_step("b_01.sh", "rm -f \"$1\""),
    report.add_step("c_02.sh", "printf 'blob-v2' > \"$1\""),
  ];
  let steps = steps
    .into_iter()
    .map(|p| stepline::Step::from_path(p).unwrap())
    .collect();

  let settings = report.settings();
  let coordinator = report.coordinator(RecordingAlerter::new());
  let ctx = stepline::ContextData::new(stepline::RunContext::new(
    report.root.clone(),
    settings.state_path(&report.root),
    settings.params_path(&report.root),
    ParameterSet::new(),
  ));

  let ran = coordinator.build_pipeline(steps).run(ctx.clone()).await.unwrap();
  assert_eq!(ran, 3);

  let snapshot = ctx.snapshot();
  assert_eq!(snapshot.state.as_bytes(), b"blob-v2");
  let updated: Vec<bool> = snapshot.executed.iter().map(|r| r.result.state_updated).collect();
  assert_eq!(updated, vec![true, false, true]);
}

#[tokio::test]
async fn test_untouched_state_is_not_marked_updated() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  let step = report.add_step("a_00.sh", "echo read-only");

  let settings = report.settings();
  let coordinator = report.coordinator(RecordingAlerter::new());
  let ctx = stepline::ContextData::new(stepline::RunContext::new(
    report.root.clone(),
    settings.state_path(&report.root),
    settings.params_path(&report.root),
    ParameterSet::new(),
  ));

  coordinator
    .build_pipeline(vec![stepline::Step::from_path(step).unwrap()])
    .run(ctx.clone())
    .await
    .unwrap();

  let snapshot = ctx.snapshot();
  assert!(snapshot.state.is_empty());
  assert_eq!(snapshot.executed.len(), 1);
  assert!(!snapshot.executed[0].result.state_updated);
  assert_eq!(snapshot.executed[0].result.stdout, "read-only\n");
}

#[tokio::test]
async fn test_values_persisted_by_a_step_win_over_config() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  report.add_step(
    "a_00.sh",
    "printf '{\"start_date\":\"2023-10-01\",\"row_count\":\"42\"}' > \"$2\"",
  );
  report.add_step("b_01.sh", "cp \"$2\" ../params_seen_by_1.json");

  report
    .coordinator(RecordingAlerter::new())
    .run(StepBounds::default(), &[])
    .await
    .unwrap();

  let seen: ParameterSet = serde_json::from_slice(&report.read_root_file("params_seen_by_1.json")).unwrap();
  assert_eq!(seen.get("start_date"), Some("2023-10-01"));
  assert_eq!(seen.get("row_count"), Some("42"));
  assert_eq!(seen.get("server"), Some("db01"));
  assert_eq!(seen.get("to_email"), Some("reports@example.org"));
  let config_path = report.root.join("config").join("config.toml");
  assert_eq!(seen.get(CONFIG_PATH_KEY), Some(config_path.display().to_string().as_str()));
}

#[tokio::test]
async fn test_first_step_sees_config_parameters() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  report.add_step("a_00.sh", "cp \"$2\" ../params_seen_by_0.json");

  report
    .coordinator(RecordingAlerter::new())
    .run(StepBounds::default(), &[])
    .await
    .unwrap();

  let seen: ParameterSet = serde_json::from_slice(&report.read_root_file("params_seen_by_0.json")).unwrap();
  assert_eq!(seen.get("start_date"), Some("2024-01-01"));
  assert_eq!(seen.get("server"), Some("db01"));
}

#[tokio::test]
async fn test_stale_param_artifact_from_earlier_run_is_cleared() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  let store = ParamStore::new(report.steps_dir().join("temp_params.json"));
  report.add_step("a_00.sh", "cp \"$2\" ../params_seen_by_0.json");

  // Starting at the first step's own number is still a fresh run.
  for bounds in [StepBounds::default(), StepBounds::new(Some(0), None)] {
    std::fs::write(store.path(), r#"{"start_date":"1999-12-31"}"#).unwrap();
    report
      .coordinator(RecordingAlerter::new())
      .run(bounds, &[])
      .await
      .unwrap();

    let seen: ParameterSet = serde_json::from_slice(&report.read_root_file("params_seen_by_0.json")).unwrap();
    assert_eq!(seen.get("start_date"), Some("2024-01-01"), "bounds {:?}", bounds);
  }
}

#[tokio::test]
async fn test_resume_keeps_parameters_persisted_before_the_failure() {
  setup_tracing();
  let report = ReportFixture::new("med_error");
  report.add_step(
    "create_yesterday_excel_11.sh",
    "printf '{\"filter_date\":\"2024-05-13\"}' > \"$2\"",
  );
  report.add_step("send_email_12.sh", "cp \"$2\" ../params_seen_by_12.json\nexit 3");

  let alerter = RecordingAlerter::new();
  let err = report
    .coordinator(alerter.clone())
    .run(StepBounds::default(), &[])
    .await
    .unwrap_err();
  assert!(matches!(err, stepline::PipelineError::ScriptExecution { code: Some(3), .. }));

  // Operator fixes step 12 and resumes from it.
  report.add_step("send_email_12.sh", "cp \"$2\" ../params_seen_by_12.json");
  std::fs::remove_file(report.root.join("params_seen_by_12.json")).unwrap();
  let outcome = report
    .coordinator(alerter.clone())
    .run(StepBounds::new(Some(12), None), &[])
    .await
    .unwrap();

  assert_eq!(outcome, RunOutcome::Completed { steps_run: 1 });
  assert_eq!(
    report.trace(),
    vec!["create_yesterday_excel_11.sh", "send_email_12.sh", "send_email_12.sh"]
  );
  let seen: ParameterSet = serde_json::from_slice(&report.read_root_file("params_seen_by_12.json")).unwrap();
  assert_eq!(seen.get("filter_date"), Some("2024-05-13"));
  assert_eq!(seen.get("server"), Some("db01"));
  assert_eq!(alerter.taken().len(), 1);
}

#[tokio::test]
async fn test_artifacts_live_in_the_steps_dir() {
  setup_tracing();
  let report = ReportFixture::new("sdoh");
  report.add_step("a_00.sh", "printf 'x' > \"$1\"\necho \"$1\" > ../args.txt\necho \"$2\" >> ../args.txt");

  report
    .coordinator(RecordingAlerter::new())
    .run(StepBounds::default(), &[])
    .await
    .unwrap();

  let args = String::from_utf8(report.read_root_file("args.txt")).unwrap();
  let lines: Vec<&str> = args.lines().collect();
  assert_eq!(lines.len(), 2);
  assert_eq!(lines[0], report.steps_dir().join("temp_state.bin").display().to_string());
  assert_eq!(lines[1], report.steps_dir().join("temp_params.json").display().to_string());
  assert_eq!(std::fs::read(report.steps_dir().join("temp_state.bin")).unwrap(), b"x");
}
