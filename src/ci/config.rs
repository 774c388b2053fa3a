//! Parsing `.local_ci.yaml`.

use crate::error::{ManagerError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pipeline definition file, relative to the repository root.
pub const CI_CONFIG_FILE: &str = ".local_ci.yaml";

/// Per-step limit when the file does not set one.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 300;

/// A validated pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: Option<String>,
    /// Variables set for every step.
    pub env: BTreeMap<String, String>,
    pub steps: Vec<Step>,
}

/// A single shell command in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub command: String,
    /// Directory relative to the repository root; `None` runs at the root.
    pub working_dir: Option<PathBuf>,
    pub allow_failure: bool,
    pub timeout: Duration,
    pub env: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawPipeline {
    name: Option<String>,
    #[serde(default)]
    env: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    steps: Option<Vec<RawStep>>,
}

#[derive(Deserialize)]
struct RawStep {
    name: Option<String>,
    run: Option<String>,
    working_dir: Option<String>,
    #[serde(default)]
    allow_failure: bool,
    timeout: Option<u64>,
    #[serde(default)]
    env: BTreeMap<String, serde_yaml::Value>,
}

fn config_error(message: impl Into<String>) -> ManagerError {
    ManagerError::CiConfig {
        message: message.into(),
    }
}

/// Scalars become their YAML text, so `CI: true` and `JOBS: 4` work
/// without quoting. `~` is the empty string.
fn env_values(raw: BTreeMap<String, serde_yaml::Value>) -> Result<BTreeMap<String, String>> {
    use serde_yaml::Value;

    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                _ => {
                    return Err(config_error(format!(
                        "env value for '{}' must be a scalar",
                        key
                    )));
                }
            };
            Ok((key, text))
        })
        .collect()
}

impl Pipeline {
    /// Load `<repo>/.local_ci.yaml`.
    pub fn load(repo_path: &Path) -> Result<Self> {
        let path = repo_path.join(CI_CONFIG_FILE);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "CI config not found");
            return Err(config_error(format!(
                "CI config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let pipeline = Self::from_yaml(&content)?;
        tracing::info!(path = %path.display(), steps = pipeline.steps.len(), "loaded CI config");
        Ok(pipeline)
    }

    /// Parse and validate a pipeline definition.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        if value.is_null() {
            return Err(config_error("CI config is empty"));
        }
        let raw: RawPipeline = serde_yaml::from_value(value)?;

        let raw_steps = raw.steps.unwrap_or_default();
        if raw_steps.is_empty() {
            return Err(config_error("CI config defines no steps"));
        }

        let steps = raw_steps
            .into_iter()
            .enumerate()
            .map(|(idx, step)| {
                let name = step
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| config_error(format!("step {} has no name", idx + 1)))?;
                let command = step
                    .run
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| config_error(format!("step '{}' has no run command", name)))?;

                Ok(Step {
                    name,
                    command,
                    working_dir: step
                        .working_dir
                        .filter(|d| !d.is_empty())
                        .map(PathBuf::from),
                    allow_failure: step.allow_failure,
                    timeout: Duration::from_secs(
                        step.timeout.unwrap_or(DEFAULT_STEP_TIMEOUT_SECS),
                    ),
                    env: env_values(step.env)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: raw.name,
            env: env_values(raw.env)?,
            steps,
        })
    }
}
