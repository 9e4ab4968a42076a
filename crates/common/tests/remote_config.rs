//! Remote configuration overlay against a fake Consul KV endpoint

use std::io::Write;
use std::sync::{Arc, Mutex};

use playtype_common::config::{EnvSource, HarnessConfig};
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn file_config(consul_port: u16) -> HarnessConfig {
    HarnessConfig::from_source(
        &EnvSource::isolated([
            ("USE_CONSUL", "true".to_string()),
            ("CONSUL_PORT", consul_port.to_string()),
            ("CONSUL_PREFIX", "ParcelQuest".to_string()),
            ("api_base_url", "https://file.example.com".to_string()),
        ]),
        "stage",
    )
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test(flavor = "current_thread")]
async fn refused_remote_store_keeps_file_config_and_warns() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = file_config(unused_port());
    let merged = config.clone().with_remote_overlay().await;

    assert_eq!(merged, config);
    let output = logs.contents();
    assert!(output.contains("WARN"), "{}", output);
    assert!(output.contains("Falling back to .env"), "{}", output);
}

#[tokio::test]
async fn remote_values_take_precedence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/ParcelQuest"))
        .and(query_param("raw", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "# shared\napi_base_url=\"https://remote.example.com\"\ndb.enabled=true\n",
        ))
        .mount(&server)
        .await;

    let config = file_config(server.address().port());
    let merged = config.clone().with_remote_overlay().await;

    assert_eq!(merged.api_base_url, "https://remote.example.com");
    assert!(merged.db.enabled);
    assert_eq!(merged.consul_prefix, config.consul_prefix);
}

#[tokio::test]
async fn empty_or_failing_store_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/ParcelQuest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# nothing here\n"))
        .mount(&server)
        .await;

    let config = file_config(server.address().port());
    assert_eq!(config.clone().with_remote_overlay().await, config);

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;

    let config = file_config(failing.address().port());
    assert_eq!(config.clone().with_remote_overlay().await, config);
}
