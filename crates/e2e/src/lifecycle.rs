//! Run-level setup and teardown
//!
//! `global_setup` runs once before any test: it starts a new run id,
//! writes the master log header and resolves the remote configuration.
//! `global_teardown` removes the shared runtime config and writes the
//! footer with the run duration.

use chrono::{DateTime, Local};
use std::path::Path;
use tracing::{info, warn};

use playtype_common::logging::append_raw;
use playtype_common::{HarnessConfig, HarnessResult, LogPaths, RUNTIME_CONFIG_FILE};

/// State carried from setup to teardown
#[derive(Debug, Clone)]
pub struct RunSetup {
    pub paths: LogPaths,
    pub config: HarnessConfig,
    pub started_at: DateTime<Local>,
}

fn display_time(at: &DateTime<Local>) -> String {
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Prepare a run rooted at `root` with logs under `logs_dir`
pub async fn global_setup(
    logs_dir: &Path,
    root: &Path,
    config: HarnessConfig,
) -> HarnessResult<RunSetup> {
    let started_at = Local::now();
    let paths = LogPaths::new_run(logs_dir)?;

    append_raw(
        &paths.master_log,
        &format!(
            "\n===== Test Run Started: {} =====\n",
            display_time(&started_at)
        ),
    )?;

    info!("USE_CONSUL: {}", config.use_consul);

    let config = if config.use_consul {
        let merged = config.with_remote_overlay().await;
        merged.write_runtime(root)?;
        merged
    } else {
        info!("Using only .env configuration (Consul disabled).");
        config
    };

    Ok(RunSetup {
        paths,
        config,
        started_at,
    })
}

/// Remove the runtime config and close the run in both logs
pub fn global_teardown(paths: &LogPaths, root: &Path, started_at: DateTime<Local>) -> HarnessResult<()> {
    let runtime_config = root.join(RUNTIME_CONFIG_FILE);
    if runtime_config.exists() {
        match std::fs::remove_file(&runtime_config) {
            Ok(()) => info!("{} deleted successfully after test run.", RUNTIME_CONFIG_FILE),
            Err(e) => warn!("Failed to delete {}: {}", RUNTIME_CONFIG_FILE, e),
        }
    } else {
        info!("No {} found - nothing to clean up.", RUNTIME_CONFIG_FILE);
    }

    let finished_at = Local::now();
    let duration = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
    let footer = format!(
        "===== Test Run Finished: {} | Duration: {}s =====\n\n",
        display_time(&finished_at),
        duration
    );

    append_raw(&paths.run_log, &footer)?;
    append_raw(&paths.master_log, &footer)?;
    Ok(())
}
