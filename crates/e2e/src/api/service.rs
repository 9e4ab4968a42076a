//! Base for endpoint-family services
//!
//! A service owns a base path and a client. Its assertion helpers turn
//! validator mismatches into `HarnessError::AssertionFailed`.

use serde_json::Value;
use tracing::{error, info, warn};

use playtype_common::{HarnessError, HarnessResult};

use super::client::ApiClient;
use super::request::ApiRequest;
use super::response::ApiResponse;
use super::validator::{ResponseValidator, TypeSchema};
use crate::db::DbRow;

#[derive(Debug, Clone)]
pub struct BaseService {
    base_path: String,
    client: ApiClient,
    validator: ResponseValidator,
}

impl BaseService {
    pub fn new(base_path: &str, client: ApiClient) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
            client,
            validator: ResponseValidator::new(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `{base_path}/{relative}`, or just the base path for an empty relative
    pub fn compose_path(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            self.base_path.clone()
        } else {
            format!("{}/{}", self.base_path, relative)
        }
    }

    /// Send `request` with its path taken relative to the base path
    pub async fn call_api(&self, mut request: ApiRequest) -> HarnessResult<ApiResponse> {
        request.path = self.compose_path(&request.path);
        self.client.call_api(request).await
    }

    pub fn assert_status(&self, response: &ApiResponse, expected: u16) -> HarnessResult<()> {
        if response.status == expected {
            info!("Status code matches: {}", expected);
            Ok(())
        } else {
            error!(
                "Status code mismatch. Expected: {}, Actual: {}",
                expected, response.status
            );
            Err(HarnessError::AssertionFailed(format!(
                "expected status {} but got {}: {}",
                expected, response.status, response.text
            )))
        }
    }

    pub fn validate_schema(&self, response: &ApiResponse, schema: &Value) -> HarnessResult<()> {
        let body = response_json(response)?;
        self.validator.validate_schema(schema, &body)?;
        Ok(())
    }

    pub fn validate_type_schema<T: TypeSchema>(&self, response: &ApiResponse) -> HarnessResult<T> {
        let body = response_json(response)?;
        Ok(self.validator.validate_type(&body)?)
    }

    /// Field-path check for JSON bodies, trimmed text check otherwise
    pub fn validate_field(
        &self,
        response: &ApiResponse,
        path: &str,
        expected: &Value,
    ) -> HarnessResult<()> {
        self.validator
            .validate_response_field(&response.text, path, expected)?;
        Ok(())
    }

    /// Check rows returned by a database query.
    ///
    /// An empty result only warns. The schema, when given, is checked
    /// against the whole row list; the field check applies to the first row.
    pub fn assert_db_query_result(
        &self,
        rows: &[DbRow],
        schema: Option<&Value>,
        field: Option<(&str, &Value)>,
    ) -> HarnessResult<()> {
        if rows.is_empty() {
            warn!("Database query returned no rows");
            return Ok(());
        }

        if let Some(schema) = schema {
            let as_value = Value::Array(rows.iter().cloned().map(Value::Object).collect());
            self.validator.validate_schema(schema, &as_value)?;
        }

        if let Some((path, expected)) = field {
            let first = Value::Object(rows[0].clone());
            self.validator.validate_field(&first, path, expected)?;
        }

        Ok(())
    }
}

fn response_json(response: &ApiResponse) -> HarnessResult<Value> {
    response.json().ok_or_else(|| {
        error!("Response body is not JSON: {}", response.text);
        HarnessError::AssertionFailed(format!("response body is not JSON: {}", response.text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn service() -> BaseService {
        let client =
            ApiClient::new("http://localhost:1", &BTreeMap::new(), Duration::from_secs(1)).unwrap();
        BaseService::new("/api", client)
    }

    fn row(value: Value) -> DbRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_compose_path() {
        let svc = service();
        assert_eq!(svc.compose_path("users"), "/api/users");
        assert_eq!(svc.compose_path("/users/login"), "/api/users/login");
        assert_eq!(svc.compose_path(""), "/api");
    }

    #[test]
    fn test_assert_status() {
        let svc = service();
        let resp = ApiResponse::new(422, BTreeMap::new(), "{}".to_string());
        assert!(svc.assert_status(&resp, 422).is_ok());
        let err = svc.assert_status(&resp, 201).unwrap_err();
        assert!(matches!(err, HarnessError::AssertionFailed(_)));
    }

    #[test]
    fn test_validate_field_on_plain_text() {
        let svc = service();
        let resp = ApiResponse::new(200, BTreeMap::new(), " pong \n".to_string());
        assert!(svc.validate_field(&resp, "any", &json!("pong")).is_ok());
        assert!(svc.validate_field(&resp, "any", &json!("ping")).is_err());
    }

    #[test]
    fn test_db_result_assertions() {
        let svc = service();
        assert!(svc.assert_db_query_result(&[], Some(&json!({"type": "string"})), None).is_ok());

        let rows = vec![row(json!({"id": 1, "email": "a@b.c"})), row(json!({"id": 2, "email": "d@e.f"}))];
        let schema = json!({"type": "array", "items": {"type": "object", "required": ["id", "email"]}});
        assert!(svc
            .assert_db_query_result(&rows, Some(&schema), Some(("email", &json!("a@b.c"))))
            .is_ok());
        assert!(svc
            .assert_db_query_result(&rows, None, Some(("id", &json!(2))))
            .is_err());
    }
}
