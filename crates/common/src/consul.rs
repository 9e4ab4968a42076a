//! Remote key/value configuration store (Consul KV)
//!
//! The store holds one key per project whose raw value is an env-style
//! document (`KEY=VALUE` per line).

use serde_json::{Map, Number, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};

/// Client for a Consul KV endpoint
pub struct ConsulKv {
    client: reqwest::Client,
    host: String,
    port: u16,
}

impl ConsulKv {
    pub fn new(host: &str, port: u16, timeout: Duration) -> HarnessResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.to_string(),
            port,
        })
    }

    /// Raw-value URL for a key
    pub fn url(&self, key: &str) -> String {
        format!("http://{}:{}/v1/kv/{}?raw", self.host, self.port, key)
    }

    /// Fetch and parse the document stored under `key`
    pub async fn fetch(&self, key: &str) -> HarnessResult<Map<String, Value>> {
        let url = self.url(key);
        info!("Fetching Consul config from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HarnessError::RemoteConfig(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarnessError::RemoteConfig(format!(
                "Failed to fetch Consul KV: {}",
                status
            )));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| HarnessError::RemoteConfig(e.to_string()))?;
        let values = parse_kv_document(&raw);
        debug!("Consul returned {} keys", values.len());
        Ok(values)
    }
}

/// Parse an env-style document.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Surrounding
/// double quotes are removed, then `true`/`false` become booleans and
/// numeric strings become numbers.
pub fn parse_kv_document(raw: &str) -> Map<String, Value> {
    let mut values = Map::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        values.insert(key.trim().to_string(), coerce(value));
    }

    values
}

fn coerce(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "" => Value::String(String::new()),
        _ => {
            if let Ok(int) = value.parse::<i64>() {
                return Value::Number(int.into());
            }
            match value.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(num) if value.chars().any(|c| c.is_ascii_digit()) => Value::Number(num),
                _ => Value::String(value.to_string()),
            }
        }
    }
}
