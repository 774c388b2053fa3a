//! Executing a pipeline against a local checkout.

use crate::ci::{Pipeline, Step};
use crate::error::Result;
use crate::process::{Outcome, run_with_timeout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Result of running one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    /// Exit code 0, or a failure tolerated by `allow_failure`.
    pub success: bool,
    /// `None` when the process never ran, timed out, or died by signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub allow_failure: bool,
    pub error: Option<String>,
}

impl StepResult {
    fn not_run(step: &Step, success: bool, error: String, duration: Duration) -> Self {
        Self {
            name: step.name.clone(),
            success,
            exit_code: None,
            stdout: String::new(),
            stderr: error.clone(),
            duration,
            allow_failure: step.allow_failure,
            error: Some(error),
        }
    }
}

/// Progress notifications emitted while a pipeline runs.
#[derive(Debug)]
pub enum StepEvent<'a> {
    Started {
        index: usize,
        total: usize,
        step: &'a Step,
    },
    Finished {
        index: usize,
        total: usize,
        result: &'a StepResult,
    },
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub success: bool,
    /// Results for every step that was attempted, in order.
    pub steps: Vec<StepResult>,
}

impl PipelineReport {
    /// The step that stopped the pipeline, if any.
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

/// Runs pipeline steps through the platform shell.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    repo_path: PathBuf,
}

impl PipelineRunner {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run every step in order, stopping at the first failure that is not
    /// allowed.
    pub fn run<F>(&self, pipeline: &Pipeline, mut on_event: F) -> PipelineReport
    where
        F: FnMut(StepEvent<'_>),
    {
        let total = pipeline.steps.len();
        let mut steps = Vec::with_capacity(total);
        let mut success = true;

        for (index, step) in pipeline.steps.iter().enumerate() {
            on_event(StepEvent::Started { index, total, step });
            let result = self.run_step(step, &pipeline.env);
            on_event(StepEvent::Finished {
                index,
                total,
                result: &result,
            });

            let stop = !result.success && !step.allow_failure;
            steps.push(result);
            if stop {
                success = false;
                break;
            }
        }

        if success {
            tracing::info!(steps = steps.len(), "CI pipeline passed");
        } else {
            tracing::error!(steps = steps.len(), "CI pipeline failed");
        }
        PipelineReport { success, steps }
    }

    /// Run a single step with the given pipeline-level environment.
    pub fn run_step(
        &self,
        step: &Step,
        pipeline_env: &std::collections::BTreeMap<String, String>,
    ) -> StepResult {
        let cwd = match &step.working_dir {
            Some(dir) => self.repo_path.join(dir),
            None => self.repo_path.clone(),
        };

        if !cwd.is_dir() {
            let error = format!("working directory does not exist: {}", cwd.display());
            tracing::error!(step = %step.name, "{}", error);
            return StepResult::not_run(step, false, error, Duration::ZERO);
        }

        tracing::info!(step = %step.name, "running CI step");
        let mut command = shell_command(&step.command);
        command
            .current_dir(&cwd)
            .envs(pipeline_env)
            .envs(&step.env);

        let started = Instant::now();
        let outcome = run_with_timeout(command, step.timeout);
        let duration = started.elapsed();

        match outcome {
            Ok(Outcome::Completed(output)) => {
                let exit_code = output.status.code();
                let success = output.status.success() || step.allow_failure;
                if success {
                    tracing::info!(step = %step.name, ?exit_code, secs = duration.as_secs_f64(), "CI step finished");
                } else {
                    tracing::error!(step = %step.name, ?exit_code, secs = duration.as_secs_f64(), "CI step failed");
                }
                StepResult {
                    name: step.name.clone(),
                    success,
                    exit_code,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration,
                    allow_failure: step.allow_failure,
                    error: None,
                }
            }
            Ok(Outcome::TimedOut) => {
                let error = format!("timed out after {}s", step.timeout.as_secs());
                tracing::error!(step = %step.name, "{}", error);
                StepResult::not_run(step, step.allow_failure, error, duration)
            }
            Err(e) => {
                let error = format!("failed to start command: {}", e);
                tracing::error!(step = %step.name, "{}", error);
                StepResult::not_run(step, step.allow_failure, error, duration)
            }
        }
    }
}

#[cfg(unix)]
fn shell_command(script: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    command
}

#[cfg(windows)]
fn shell_command(script: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(script);
    command
}

/// Load `<repo>/.local_ci.yaml` and run it, logging progress.
pub fn run_pipeline(repo_path: &Path) -> Result<PipelineReport> {
    let pipeline = Pipeline::load(repo_path)?;
    Ok(PipelineRunner::new(repo_path).run(&pipeline, |_| {}))
}
