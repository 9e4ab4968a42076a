//! PlayType Common Library
//!
//! Configuration, logging, error types and fake-data helpers shared by the
//! API/UI harness and the metrics exporter.

pub mod config;
pub mod consul;
pub mod datagen;
pub mod error;
pub mod logging;

pub use config::{HarnessConfig, RUNTIME_CONFIG_FILE};
pub use datagen::DataGenerator;
pub use error::{HarnessError, HarnessResult};
pub use logging::LogPaths;

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory holding run and master logs
pub fn default_logs_dir() -> std::path::PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join("logs")
}
