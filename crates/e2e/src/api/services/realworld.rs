//! RealWorld (Conduit) user and article endpoints

use serde_json::Value;
use std::collections::BTreeMap;

use playtype_common::HarnessResult;

use crate::api::client::ApiClient;
use crate::api::request::ApiRequest;
use crate::api::response::ApiResponse;
use crate::api::service::BaseService;

pub const DEFAULT_BASE_PATH: &str = "/api";

#[derive(Debug, Clone)]
pub struct RealWorldService {
    base: BaseService,
}

impl RealWorldService {
    pub fn new(base_path: &str, client: ApiClient) -> Self {
        let base_path = if base_path.is_empty() {
            DEFAULT_BASE_PATH
        } else {
            base_path
        };
        Self {
            base: BaseService::new(base_path, client),
        }
    }

    /// Shared assertion helpers
    pub fn base(&self) -> &BaseService {
        &self.base
    }

    /// POST `users`
    pub async fn register_user(&self, payload: &Value) -> HarnessResult<ApiResponse> {
        self.base
            .call_api(ApiRequest::post("users").json(payload.clone()))
            .await
    }

    /// POST `users/login`
    pub async fn login_user(&self, payload: &Value) -> HarnessResult<ApiResponse> {
        self.base
            .call_api(ApiRequest::post("users/login").json(payload.clone()))
            .await
    }

    /// POST `articles` with caller headers (typically `Authorization: Token ...`)
    pub async fn create_article(
        &self,
        payload: &Value,
        headers: BTreeMap<String, String>,
    ) -> HarnessResult<ApiResponse> {
        self.base
            .call_api(
                ApiRequest::post("articles")
                    .headers(headers)
                    .json(payload.clone()),
            )
            .await
    }
}
