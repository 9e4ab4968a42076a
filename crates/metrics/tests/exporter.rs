//! Report → `.prom` file → `/metrics`

use std::net::SocketAddr;
use std::path::Path;

use playtype_common::HarnessError;
use playtype_metrics::{router, write_metrics_file, MetricsServerConfig};

const SAMPLE_REPORT: &str = r#"{
  "config": {"version": "1.44.0"},
  "suites": [
    {
      "title": "api/user.spec.ts",
      "file": "api/user.spec.ts",
      "specs": [],
      "suites": [
        {
          "title": "User API",
          "file": "api/user.spec.ts",
          "specs": [
            {
              "title": "register new user",
              "file": "api/user.spec.ts",
              "tests": [
                {"status": "expected", "results": [{"status": "passed", "duration": 812, "errors": []}]}
              ]
            },
            {
              "title": "login with bad password",
              "file": "api/user.spec.ts",
              "tests": [
                {"status": "unexpected", "results": [{"status": "failed", "duration": 230,
                  "errors": [{"message": "Error: expect(received).toBe(expected)\n\nExpected: 200"}]}]}
              ]
            },
            {
              "title": "skipped case",
              "file": "api/user.spec.ts",
              "tests": [{"status": "skipped", "results": []}]
            }
          ]
        }
      ]
    }
  ]
}"#;

fn write_report(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("playwright-report").join("results.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, SAMPLE_REPORT).unwrap();
    path
}

#[test]
fn generates_file_from_sample_report() {
    let tmp = tempfile::tempdir().unwrap();
    let report = write_report(tmp.path());
    let output = tmp.path().join("metrics").join("playwright-metrics.prom");

    let summary = write_metrics_file(&report, &output).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 1);

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains(
        "playwright_test_duration_seconds{test=\"register_new_user\",suite=\"User_API\",file=\"user_spec_ts\",status=\"passed\"} 0.812\n"
    ));
    assert!(content.contains("status=\"failed\"} 0\n"));
    assert!(content.contains("error_type=\"Error__expect_received__toBe_expected_\"} 1 "));
    assert!(content.contains(
        "playwright_test_result{test=\"skipped_case\",suite=\"User_API\",file=\"user_spec_ts\",status=\"skipped\"} 0\n"
    ));
    assert!(content.contains("playwright_tests_failed{} 2\n"));
}

#[test]
fn missing_report_removes_stale_output() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("metrics").join("playwright-metrics.prom");
    std::fs::create_dir_all(output.parent().unwrap()).unwrap();
    std::fs::write(&output, "stale").unwrap();

    let err = write_metrics_file(&tmp.path().join("missing.json"), &output).unwrap_err();
    assert!(matches!(err, HarnessError::ReportNotFound(_)));
    assert!(!output.exists());
}

#[tokio::test]
async fn endpoint_returns_404_then_200() {
    let tmp = tempfile::tempdir().unwrap();
    let metrics_path = tmp.path().join("metrics").join("playwright-metrics.prom");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = router(MetricsServerConfig {
        metrics_path: metrics_path.clone(),
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = format!("http://{}/metrics", addr);
    let missing = reqwest::get(&url).await.unwrap();
    assert_eq!(missing.status(), 404);
    assert!(missing.text().await.unwrap().contains("Metrics file not found"));

    let report = write_report(tmp.path());
    write_metrics_file(&report, &metrics_path).unwrap();

    let found = reqwest::get(&url).await.unwrap();
    assert_eq!(found.status(), 200);
    assert_eq!(
        found.headers()["content-type"].to_str().unwrap(),
        "text/plain; version=0.0.4"
    );
    assert!(found.text().await.unwrap().contains("playwright_tests_total{} 3"));
}
