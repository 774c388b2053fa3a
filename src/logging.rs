//! Tracing setup: stderr plus a per-day log file.

use crate::config::AppConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Map a configured level name to a tracing filter directive.
///
/// Accepts the names used in the settings file (`WARNING`, `CRITICAL`) as
/// well as tracing's own. Unknown names fall back to `info`.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

/// Path of today's log file inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("app_{}.log", today))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. When `log_dir` is given, a
/// second, uncoloured copy of every event goes to `app_YYYY-MM-DD.log` in
/// that directory. Calling this twice leaves the first subscriber in place.
pub fn init(config: &AppConfig, log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.log_level)));

    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(dir))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();

    if installed.is_ok() {
        tracing::debug!(level = %config.log_level, "logging initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("warning"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive(" Info "), "info");
        assert_eq!(level_directive("verbose"), "info");
    }

    #[test]
    fn test_log_file_name_is_dated() {
        let path = log_file_path(Path::new("/tmp/logs"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("app_"));
        assert!(name.ends_with(".log"));
        assert_eq!(name.len(), "app_YYYY-MM-DD.log".len());
    }
}
