//! Integration tests for the local CI runner.
#![cfg(unix)]

use repo_manager::ci::{
    CI_CONFIG_FILE, Pipeline, PipelineRunner, StepEvent, run_pipeline,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn run(dir: &TempDir, yaml: &str) -> repo_manager::ci::PipelineReport {
    let pipeline = Pipeline::from_yaml(yaml).unwrap();
    PipelineRunner::new(dir.path()).run(&pipeline, |_| {})
}

#[test]
fn test_successful_step_captures_output() {
    let dir = TempDir::new().unwrap();
    let report = run(&dir, "steps:\n  - name: Greet\n    run: echo hello\n");

    assert!(report.success);
    assert_eq!(report.steps.len(), 1);
    let step = &report.steps[0];
    assert!(step.success);
    assert_eq!(step.exit_code, Some(0));
    assert_eq!(step.stdout.trim(), "hello");
    assert!(step.error.is_none());
    assert!(report.failed_step().is_none());
}

#[test]
fn test_failure_stops_pipeline() {
    let dir = TempDir::new().unwrap();
    let yaml = r#"
steps:
  - name: Build
    run: "true"
  - name: Test
    run: echo broken >&2; exit 3
  - name: Deploy
    run: touch deployed
"#;
    let report = run(&dir, yaml);

    assert!(!report.success);
    assert_eq!(report.steps.len(), 2);

    let failed = report.failed_step().unwrap();
    assert_eq!(failed.name, "Test");
    assert_eq!(failed.exit_code, Some(3));
    assert_eq!(failed.stderr.trim(), "broken");
    assert!(!dir.path().join("deployed").exists());
}

#[test]
fn test_allowed_failure_continues() {
    let dir = TempDir::new().unwrap();
    let yaml = r#"
steps:
  - name: Lint
    run: exit 1
    allow_failure: true
  - name: Test
    run: touch tested
"#;
    let report = run(&dir, yaml);

    assert!(report.success);
    assert_eq!(report.steps.len(), 2);
    assert!(report.steps[0].success);
    assert!(report.steps[0].allow_failure);
    assert_eq!(report.steps[0].exit_code, Some(1));
    assert!(dir.path().join("tested").exists());
}

#[test]
fn test_timeout_kills_step() {
    let dir = TempDir::new().unwrap();
    let yaml = "steps:\n  - name: Hang\n    run: sleep 10\n    timeout: 1\n";
    let report = run(&dir, yaml);

    assert!(!report.success);
    let step = &report.steps[0];
    assert_eq!(step.exit_code, None);
    assert!(step.error.as_deref().unwrap().contains("timed out"));
    assert!(step.duration < Duration::from_secs(10));
}

#[test]
fn test_timeout_with_allow_failure() {
    let dir = TempDir::new().unwrap();
    let yaml = r#"
steps:
  - name: Slow
    run: sleep 10
    timeout: 1
    allow_failure: true
  - name: After
    run: "true"
"#;
    let report = run(&dir, yaml);

    assert!(report.success);
    assert_eq!(report.steps.len(), 2);
}

#[test]
fn test_missing_working_dir_fails_without_running() {
    let dir = TempDir::new().unwrap();
    let yaml = "steps:\n  - name: Sub\n    run: touch ran\n    working_dir: nope\n";
    let report = run(&dir, yaml);

    assert!(!report.success);
    let step = &report.steps[0];
    assert!(
        step.error
            .as_deref()
            .unwrap()
            .contains("working directory does not exist")
    );
    assert!(!dir.path().join("nope").exists());
    assert!(!dir.path().join("ran").exists());
}

#[test]
fn test_working_dir_is_relative_to_repo() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let yaml = "steps:\n  - name: Where\n    run: pwd\n    working_dir: sub\n";
    let report = run(&dir, yaml);

    assert!(report.success);
    assert!(report.steps[0].stdout.trim().ends_with("sub"));
}

#[test]
fn test_step_env_overrides_pipeline_env() {
    let dir = TempDir::new().unwrap();
    let yaml = r#"
env:
  STAGE: ci
  MODE: debug
steps:
  - name: Env
    run: echo "$STAGE-$MODE"
    env:
      MODE: release
"#;
    let report = run(&dir, yaml);

    assert_eq!(report.steps[0].stdout.trim(), "ci-release");
}

#[test]
fn test_progress_events() {
    let dir = TempDir::new().unwrap();
    let pipeline =
        Pipeline::from_yaml("steps:\n  - name: One\n    run: 'true'\n  - name: Two\n    run: 'true'\n")
            .unwrap();

    let mut events = Vec::new();
    let report = PipelineRunner::new(dir.path()).run(&pipeline, |event| match event {
        StepEvent::Started { index, total, step } => {
            events.push(format!("start {}/{} {}", index + 1, total, step.name))
        }
        StepEvent::Finished { index, result, .. } => {
            events.push(format!("finish {} {}", index + 1, result.success))
        }
    });

    assert!(report.success);
    assert_eq!(
        events,
        vec![
            "start 1/2 One",
            "finish 1 true",
            "start 2/2 Two",
            "finish 2 true",
        ]
    );
}

#[test]
fn test_run_pipeline_from_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CI_CONFIG_FILE),
        "name: local\nsteps:\n  - name: Marker\n    run: echo ok > marker.txt\n",
    )
    .unwrap();

    let report = run_pipeline(dir.path()).unwrap();
    assert!(report.success);
    assert_eq!(
        fs::read_to_string(dir.path().join("marker.txt"))
            .unwrap()
            .trim(),
        "ok"
    );
}

#[test]
fn test_run_pipeline_without_config() {
    let dir = TempDir::new().unwrap();
    assert!(run_pipeline(dir.path()).is_err());
}
