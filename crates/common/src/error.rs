//! Error types for the PlayType harness

use thiserror::Error;

/// Result type alias using the harness error
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Harness error types
///
/// Validation mismatches are not represented here until a caller decides to
/// escalate them; see [`HarnessError::AssertionFailed`].
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("SSH connection failed: {0}")]
    SshConnect(String),

    #[error("Tunnel server error: {0}")]
    Tunnel(String),

    #[error("Database connection failed: {0}")]
    DatabaseConnect(String),

    #[error("Database is disabled in config")]
    DatabaseDisabled,

    #[error("Query execution failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Remote config fetch failed: {0}")]
    RemoteConfig(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Test report not found: {0}")]
    ReportNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HarnessError {
    /// Whether this error came from the network layer rather than the harness
    pub fn is_transport(&self) -> bool {
        matches!(self, HarnessError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_messages() {
        let err = HarnessError::SshConnect("connection refused".to_string());
        assert_eq!(err.to_string(), "SSH connection failed: connection refused");

        let err = HarnessError::DatabaseConnect("timeout".to_string());
        assert_eq!(err.to_string(), "Database connection failed: timeout");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HarnessError = io.into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
