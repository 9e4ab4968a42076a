//! Captured API responses

use serde_json::Value;
use std::collections::BTreeMap;

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// Status, headers and raw body of a completed call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub text: String,
}

impl ApiResponse {
    pub fn new(status: u16, headers: BTreeMap<String, String>, text: String) -> Self {
        Self {
            status,
            headers,
            text,
        }
    }

    /// Body as JSON, if it parses
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.text).ok()
    }

    /// Body decoded as JSON when possible, raw text otherwise
    pub fn body(&self) -> ResponseBody {
        match self.json() {
            Some(value) => ResponseBody::Json(value),
            None => ResponseBody::Text(self.text.clone()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.get(&name).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_decoding() {
        let json_resp = ApiResponse::new(200, BTreeMap::new(), r#"{"ok":true}"#.to_string());
        assert_eq!(json_resp.body(), ResponseBody::Json(json!({"ok": true})));

        let text_resp = ApiResponse::new(500, BTreeMap::new(), "Internal error".to_string());
        assert_eq!(text_resp.body(), ResponseBody::Text("Internal error".to_string()));
        assert!(!text_resp.is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let resp = ApiResponse::new(201, headers, String::new());
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
    }
}
