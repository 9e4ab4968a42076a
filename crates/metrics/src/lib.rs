//! PlayType Metrics
//!
//! Turns a Playwright JSON report into Prometheus exposition lines and
//! serves the resulting file at `/metrics`.

pub mod generate;
pub mod report;
pub mod server;

pub use generate::{generate_metrics, sanitize_label, write_metrics_file, MetricsSummary};
pub use report::TestReport;
pub use server::{router, serve, MetricsServerConfig};

/// Default report written by `--reporter=json`
pub const DEFAULT_REPORT_PATH: &str = "playwright-report/results.json";

/// Default exposition file
pub const DEFAULT_METRICS_PATH: &str = "metrics/playwright-metrics.prom";

/// Default exporter port
pub const DEFAULT_PORT: u16 = 9464;
