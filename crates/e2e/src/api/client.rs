//! HTTP client used by every service

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

use playtype_common::{HarnessConfig, HarnessError, HarnessResult};

use super::request::{normalize_path, ApiRequest, RequestBody};
use super::response::ApiResponse;

/// Thin wrapper over `reqwest::Client` bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        default_headers: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> HarnessResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        merge_headers(&mut headers, default_headers)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: headers,
        })
    }

    /// Client for `base_url` carrying the configured bearer token
    pub fn from_config(
        config: &HarnessConfig,
        base_url: &str,
        extra_headers: &BTreeMap<String, String>,
    ) -> HarnessResult<Self> {
        let mut headers = BTreeMap::new();
        if let Some(token) = config.auth.token.as_deref().filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        }
        headers.extend(extra_headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::new(base_url, &headers, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL a request resolves to
    pub fn endpoint(&self, request: &ApiRequest) -> HarnessResult<String> {
        Ok(format!(
            "{}{}{}",
            self.base_url,
            normalize_path(&request.path),
            request.query_suffix()?
        ))
    }

    /// Issue one request and capture the response.
    ///
    /// Non-2xx statuses are returned as responses; only transport failures
    /// are errors.
    pub async fn call_api(&self, request: ApiRequest) -> HarnessResult<ApiResponse> {
        let endpoint = self.endpoint(&request)?;
        info!("Api Endpoint: {} - {}", request.method, endpoint);

        let mut headers = self.default_headers.clone();
        if let Some(extra) = &request.headers {
            debug!("Request headers: {:?}", extra);
            merge_headers(&mut headers, extra)?;
        }

        let mut builder = self
            .http
            .request(request.method.into(), &endpoint)
            .headers(headers);

        if let Some(body) = &request.body {
            if request.method.carries_body() {
                debug!("Request payload: {}", body_for_log(body));
            }
            builder = match body {
                RequestBody::Json(value) => builder.body(serde_json::to_vec(value)?),
                RequestBody::Raw(text) => builder.body(text.clone()),
            };
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Api call to {} failed: {}", endpoint, e);
                return Err(HarnessError::Transport(e));
            }
        };

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!("Reading response from {} failed: {}", endpoint, e);
                return Err(HarnessError::Transport(e));
            }
        };

        info!("Response status: {}", status);
        debug!("Response body: {}", text);

        Ok(ApiResponse::new(status, response_headers, text))
    }
}

fn merge_headers(target: &mut HeaderMap, extra: &BTreeMap<String, String>) -> HarnessResult<()> {
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HarnessError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HarnessError::InvalidHeader(format!("{}: {}", name, e)))?;
        target.insert(name, value);
    }
    Ok(())
}

fn body_for_log(body: &RequestBody) -> String {
    match body {
        RequestBody::Json(value) => value.to_string(),
        RequestBody::Raw(text) => text.clone(),
    }
}
