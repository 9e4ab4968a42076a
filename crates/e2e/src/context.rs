//! Per-test context
//!
//! Built once by the test and passed by reference to helpers; nothing in
//! the harness keeps global state besides the tracing subscriber.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use playtype_common::{HarnessConfig, HarnessResult, LogPaths};

use crate::api::services::RealWorldService;
use crate::api::{ApiClient, ResponseValidator};
use crate::db::DatabaseService;

const UNKNOWN_TEST: &str = "Unknown Test";

pub struct TestContext {
    pub config: Arc<HarnessConfig>,
    pub client: ApiClient,
    pub validator: ResponseValidator,
    pub realworld: RealWorldService,
    pub db: DatabaseService,
    log_paths: Option<LogPaths>,
}

impl TestContext {
    /// Wire up the client, services and database access for `base_url`
    pub fn setup(
        config: Arc<HarnessConfig>,
        base_url: &str,
        extra_headers: &BTreeMap<String, String>,
    ) -> HarnessResult<Self> {
        let client = ApiClient::from_config(&config, base_url, extra_headers)?;
        let realworld = RealWorldService::new(&config.api_base_path, client.clone());
        let db = DatabaseService::new(config.db.clone());

        info!("Test context ready for {}", client.base_url());

        Ok(Self {
            config,
            client,
            validator: ResponseValidator::new(),
            realworld,
            db,
            log_paths: None,
        })
    }

    /// Remember where this run logs so teardown can point at it
    pub fn with_log_paths(mut self, paths: LogPaths) -> Self {
        self.log_paths = Some(paths);
        self
    }

    /// Log `message : [title]`
    pub fn log_test_title(&self, message: &str, title: Option<&str>) {
        info!("{}", format_title(message, title));
    }

    pub fn teardown(self) {
        info!("Test completed");
        if let Some(paths) = &self.log_paths {
            info!("Run log: {}", paths.run_log.display());
        }
    }
}

fn format_title(message: &str, title: Option<&str>) -> String {
    let title = title.filter(|t| !t.is_empty()).unwrap_or(UNKNOWN_TEST);
    format!("{} : [{}]", message, title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_formatting() {
        assert_eq!(
            format_title("Starting test", Some("Register user")),
            "Starting test : [Register user]"
        );
        assert_eq!(format_title("Starting test", None), "Starting test : [Unknown Test]");
        assert_eq!(format_title("Starting test", Some("")), "Starting test : [Unknown Test]");
    }

    #[test]
    fn test_setup_uses_configured_base_path() {
        let mut config = HarnessConfig::default();
        config.api_base_path = "/v2".to_string();
        let ctx = TestContext::setup(Arc::new(config), "http://localhost:3000", &BTreeMap::new())
            .unwrap();
        assert_eq!(ctx.realworld.base().base_path(), "/v2");
        assert_eq!(ctx.client.base_url(), "http://localhost:3000");
        assert!(!ctx.db.is_enabled());
        ctx.teardown();
    }
}
