//! Prometheus exposition lines from a test report

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use playtype_common::HarnessResult;

use crate::report::{non_empty, Spec, Suite, TestEntry, TestReport};

const MAX_LABEL_LEN: usize = 100;

/// Generated lines and the pass tally
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub lines: Vec<String>,
    pub total: u64,
    pub passed: u64,
}

impl MetricsSummary {
    pub fn failed(&self) -> u64 {
        self.total - self.passed
    }

    /// File content: one line each, newline terminated
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Replace every non-word character with `_` and cap the length
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(MAX_LABEL_LEN)
        .collect()
}

pub fn generate_metrics(report: &TestReport, timestamp: i64) -> MetricsSummary {
    let mut lines = Vec::new();
    let mut total = 0;
    let mut passed = 0;

    for (suite, spec, test) in report.tests() {
        total += 1;
        if push_test(&mut lines, suite, spec, test, timestamp) {
            passed += 1;
        }
    }

    lines.push(format!("playwright_tests_total{{}} {}", total));
    lines.push(format!("playwright_tests_passed{{}} {}", passed));
    lines.push(format!("playwright_tests_failed{{}} {}", total - passed));
    lines.push(format!(
        "playwright_test_run_timestamp{{}} {} {}",
        timestamp, timestamp
    ));

    MetricsSummary {
        lines,
        total,
        passed,
    }
}

fn push_test(
    lines: &mut Vec<String>,
    suite: &Suite,
    spec: &Spec,
    test: &TestEntry,
    timestamp: i64,
) -> bool {
    let test_name = sanitize_label(non_empty(spec.title.as_deref()).unwrap_or("unknown_test"));
    let suite_name = sanitize_label(non_empty(suite.title.as_deref()).unwrap_or("unknown_suite"));
    let file_name = sanitize_label(
        non_empty(spec.file.as_deref())
            .and_then(|f| Path::new(f).file_name())
            .and_then(|f| f.to_str())
            .unwrap_or("unknown_file"),
    );

    let (status, duration_ms) = test.outcome();
    let is_passed = status == "passed";
    debug!(
        "Processing test: \"{}\", status: {}, passed: {}",
        test_name, status, is_passed
    );

    let labels = format!(
        "test=\"{}\",suite=\"{}\",file=\"{}\",status=\"{}\"",
        test_name, suite_name, file_name, status
    );
    if duration_ms > 0.0 {
        lines.push(format!(
            "playwright_test_duration_seconds{{{}}} {}",
            labels,
            duration_ms / 1000.0
        ));
    }
    lines.push(format!(
        "playwright_test_result{{{}}} {}",
        labels,
        u8::from(is_passed)
    ));

    if let Some(message) = test.first_error() {
        lines.push(format!(
            "playwright_test_error{{test=\"{}\",error_type=\"{}\"}} 1 {}",
            test_name,
            sanitize_label(message),
            timestamp
        ));
    }

    is_passed
}

/// Read `report_path`, write the exposition file to `output_path`
///
/// The output directory is created and any previous file removed before the
/// report is read, so a missing report leaves no stale metrics behind.
pub fn write_metrics_file(report_path: &Path, output_path: &Path) -> HarnessResult<MetricsSummary> {
    if let Some(dir) = output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            info!("Creating metrics directory: {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
    }
    if output_path.exists() {
        info!("Removing existing file: {}", output_path.display());
        std::fs::remove_file(output_path)?;
    }

    info!("Reading JSON report from: {}", report_path.display());
    let report = TestReport::from_file(report_path)?;
    let summary = generate_metrics(&report, chrono::Utc::now().timestamp());

    std::fs::write(output_path, summary.render())?;
    info!(
        "Generated {} metric lines, saved to {}",
        summary.lines.len(),
        output_path.display()
    );
    info!("Test summary: {}/{} passed", summary.passed, summary.total);
    Ok(summary)
}

/// Resolve a relative path against the working directory
pub fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportedError, TestResult};

    fn report_with(entry: TestEntry, spec_title: &str, file: &str) -> TestReport {
        TestReport {
            suites: vec![Suite {
                title: Some("chromium".to_string()),
                suites: vec![Suite {
                    title: Some("User API".to_string()),
                    specs: vec![Spec {
                        title: Some(spec_title.to_string()),
                        file: Some(file.to_string()),
                        tests: vec![entry],
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Register user - 201"), "Register_user___201");
        assert_eq!(sanitize_label("ok_name9"), "ok_name9");
        assert_eq!(sanitize_label(&"x".repeat(150)).len(), 100);
    }

    #[test]
    fn test_passed_test_lines() {
        let entry = TestEntry {
            results: vec![TestResult {
                status: Some("passed".to_string()),
                duration: Some(1500.0),
                errors: Vec::new(),
            }],
            ..Default::default()
        };
        let summary = generate_metrics(&report_with(entry, "login", "tests/api/user.spec.ts"), 1700000000);

        assert_eq!(summary.total, 1);
        assert_eq!(summary.passed, 1);
        assert_eq!(
            summary.lines,
            vec![
                "playwright_test_duration_seconds{test=\"login\",suite=\"User_API\",file=\"user_spec_ts\",status=\"passed\"} 1.5",
                "playwright_test_result{test=\"login\",suite=\"User_API\",file=\"user_spec_ts\",status=\"passed\"} 1",
                "playwright_tests_total{} 1",
                "playwright_tests_passed{} 1",
                "playwright_tests_failed{} 0",
                "playwright_test_run_timestamp{} 1700000000 1700000000",
            ]
        );
    }

    #[test]
    fn test_failed_test_with_error() {
        let entry = TestEntry {
            results: vec![TestResult {
                status: Some("failed".to_string()),
                duration: Some(0.0),
                errors: vec![ReportedError {
                    message: Some("Timeout 5000ms exceeded.\nCall log:".to_string()),
                }],
            }],
            ..Default::default()
        };
        let summary = generate_metrics(&report_with(entry, "create quest", "ui.spec.ts"), 42);

        assert_eq!(summary.failed(), 1);
        assert!(!summary.lines[0].starts_with("playwright_test_duration_seconds"));
        assert!(summary.lines[0].ends_with("status=\"failed\"} 0"));
        assert_eq!(
            summary.lines[1],
            "playwright_test_error{test=\"create_quest\",error_type=\"Timeout_5000ms_exceeded_\"} 1 42"
        );
        assert!(summary.render().ends_with("playwright_test_run_timestamp{} 42 42\n"));
    }

    #[test]
    fn test_empty_titles_use_defaults() {
        let entry = TestEntry {
            status: Some("passed".to_string()),
            ..Default::default()
        };
        let mut report = report_with(entry, "", "");
        report.suites[0].suites[0].title = Some(String::new());
        let summary = generate_metrics(&report, 1);

        assert_eq!(
            summary.lines[0],
            "playwright_test_result{test=\"unknown_test\",suite=\"unknown_suite\",file=\"unknown_file\",status=\"passed\"} 1"
        );
    }

    #[test]
    fn test_empty_report() {
        let summary = generate_metrics(&TestReport::default(), 7);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.lines.len(), 4);
        assert_eq!(summary.lines[2], "playwright_tests_failed{} 0");
    }
}
