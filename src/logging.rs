use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Install the global subscriber.
///
/// Console output goes to stderr at `info` unless `RUST_LOG` says otherwise.
/// When `log_dir` is given, a debug-level log file is also written there and
/// its path returned. If the log file cannot be created, console logging is
/// still installed and the failure is logged as a warning.
#[inline]
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (log_file, file_error) = match log_dir.map(open_log_file).transpose() {
        Ok(opened) => (opened, None),
        Err(e) => (None, Some(e)),
    };
    let (file_layer, log_path) = match log_file {
        Some((file, path)) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    if let Some(e) = file_error {
        warn!("File logging disabled: {:#}", e);
    }

    Ok(log_path)
}

/// Create `dir` if needed and open a fresh timestamped log file inside it
fn open_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join(log_file_name(Local::now()));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    Ok((file, path))
}

/// Name of the log file for a run started at `started`
#[inline]
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("app_{}.log", started.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_uses_timestamp() {
        let started = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("valid local time");
        assert_eq!(log_file_name(started), "app_20240309_140507.log");
    }

    #[test]
    fn open_log_file_creates_directory() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let log_dir = dir.path().join("logs");

        let (_file, path) = open_log_file(&log_dir).expect("should open log file");
        assert!(path.starts_with(&log_dir));
        assert!(path.is_file());
    }

    #[test]
    fn unwritable_log_dir_falls_back_to_console() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file in the way").expect("write blocker");

        assert!(open_log_file(&blocker).is_err());

        let log_path = init_logging(Some(&blocker)).expect("console logging still installs");
        assert_eq!(log_path, None);
        assert!(tracing::dispatcher::has_been_set());
    }
}
