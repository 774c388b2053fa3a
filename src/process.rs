//! Subprocess execution with a wall-clock limit.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// How a bounded subprocess run ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed(Output),
    TimedOut,
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// Blocks the calling thread on a private current-thread runtime, so it must
/// not be called from inside another tokio runtime. The child is killed if
/// `timeout` elapses first.
pub(crate) fn run_with_timeout(mut command: Command, timeout: Duration) -> std::io::Result<Outcome> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let child = command.spawn()?;
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output.map(Outcome::Completed),
            Err(_) => Ok(Outcome::TimedOut),
        }
    })
}
