//! Local CI/CD pipelines.
//!
//! A repository opts in by committing a `.local_ci.yaml`:
//!
//! ```yaml
//! steps:
//!   - name: Test
//!     run: cargo test
//!   - name: Docs
//!     run: cargo doc --no-deps
//!     allow_failure: true
//!     timeout: 120
//! ```
//!
//! Steps run in order through the shell. A failing step stops the pipeline
//! unless it sets `allow_failure`.

mod config;
mod runner;

pub use config::{CI_CONFIG_FILE, DEFAULT_STEP_TIMEOUT_SECS, Pipeline, Step};
pub use runner::{PipelineReport, PipelineRunner, StepEvent, StepResult, run_pipeline};
