//! Structured logging to the console, a per-run log file and a master log
//!
//! Every process of a run shares one run id stored in `logs/.run-id.json`,
//! so workers append to the same `test-run-<id>.log`. `master.log`
//! accumulates all runs.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

use crate::error::HarnessResult;

const RUN_ID_FILE: &str = ".run-id.json";
const MASTER_LOG_FILE: &str = "master.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunIdRecord {
    run_id: String,
}

/// Locations of the log files for one run
#[derive(Debug, Clone)]
pub struct LogPaths {
    pub dir: PathBuf,
    pub run_id: String,
    pub run_log: PathBuf,
    pub master_log: PathBuf,
}

impl LogPaths {
    /// Reuse the run id recorded in `dir`, creating one if none exists yet
    pub fn resolve(dir: &Path) -> HarnessResult<Self> {
        std::fs::create_dir_all(dir)?;
        let id_file = dir.join(RUN_ID_FILE);

        let run_id = match std::fs::read_to_string(&id_file) {
            Ok(content) => serde_json::from_str::<RunIdRecord>(&content)?.run_id,
            Err(_) => {
                let run_id = run_id_now();
                write_run_id(&id_file, &run_id)?;
                run_id
            }
        };

        Ok(Self::with_run_id(dir, run_id))
    }

    /// Start a new run, overwriting any previously recorded run id
    pub fn new_run(dir: &Path) -> HarnessResult<Self> {
        std::fs::create_dir_all(dir)?;
        let run_id = run_id_now();
        write_run_id(&dir.join(RUN_ID_FILE), &run_id)?;
        Ok(Self::with_run_id(dir, run_id))
    }

    fn with_run_id(dir: &Path, run_id: String) -> Self {
        Self {
            dir: dir.to_path_buf(),
            run_log: dir.join(format!("test-run-{}.log", run_id)),
            master_log: dir.join(MASTER_LOG_FILE),
            run_id,
        }
    }
}

fn write_run_id(path: &Path, run_id: &str) -> HarnessResult<()> {
    let record = RunIdRecord {
        run_id: run_id.to_string(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
    Ok(())
}

/// Local wall-clock time with path-hostile characters replaced by `-`
pub fn run_id_now() -> String {
    Local::now()
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
        .replace(['/', ',', ':', ' '], "-")
}

/// Append raw text to a log file, bypassing the subscriber
pub fn append_raw(path: &Path, text: &str) -> HarnessResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Install the process-wide subscriber.
///
/// The console shows `console_level` (overridable with `RUST_LOG`), both
/// files receive debug output. Calling this again is a no-op.
pub fn init(paths: &LogPaths, console_level: &str) -> HarnessResult<()> {
    std::fs::create_dir_all(&paths.dir)?;

    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));

    let console = fmt::layer()
        .with_timer(timer.clone())
        .with_target(false)
        .with_filter(console_filter);

    let run_file = fmt::layer()
        .with_writer(file_writer(&paths.run_log))
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_target(false)
        .with_filter(LevelFilter::DEBUG);

    let master_file = fmt::layer()
        .with_writer(file_writer(&paths.master_log))
        .with_ansi(false)
        .with_timer(timer)
        .with_target(false)
        .with_filter(LevelFilter::DEBUG);

    if tracing_subscriber::registry()
        .with(console)
        .with(run_file)
        .with(master_file)
        .try_init()
        .is_err()
    {
        debug!("Logger already initialised");
    }

    Ok(())
}

fn file_writer(path: &Path) -> tracing_appender::rolling::RollingFileAppender {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| MASTER_LOG_FILE.into());
    tracing_appender::rolling::never(dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_is_path_safe() {
        let id = run_id_now();
        assert!(!id.contains(['/', ',', ':', ' ']));
        assert!(id.ends_with("AM") || id.ends_with("PM"));
    }

    #[test]
    fn test_run_id_is_shared_between_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let first = LogPaths::resolve(dir.path()).unwrap();
        let second = LogPaths::resolve(dir.path()).unwrap();
        assert_eq!(first.run_id, second.run_id);
        assert_eq!(first.run_log, second.run_log);
        assert!(dir.path().join(RUN_ID_FILE).exists());
    }

    #[test]
    fn test_new_run_overwrites_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RUN_ID_FILE), r#"{"runId":"old"}"#).unwrap();
        assert_eq!(LogPaths::resolve(dir.path()).unwrap().run_id, "old");

        let paths = LogPaths::new_run(dir.path()).unwrap();
        assert_ne!(paths.run_id, "old");
        assert_eq!(paths.master_log, dir.path().join("master.log"));
    }

    #[test]
    fn test_append_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.log");
        append_raw(&path, "one\n").unwrap();
        append_raw(&path, "two\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "one\ntwo\n");
    }
}
