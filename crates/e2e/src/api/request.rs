//! Request descriptors

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use playtype_common::{HarnessError, HarnessResult};

/// HTTP verbs used by the REST endpoints under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether the payload is logged for this method
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Query parameters in any of the accepted shapes
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    /// Already-encoded query string, with or without a leading `?`
    Raw(String),
    /// Ordered key/value pairs
    Pairs(Vec<(String, String)>),
    /// Flat mapping of key to primitive
    Map(Map<String, Value>),
}

impl QueryParams {
    pub fn pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        QueryParams::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Encode into a single query string without the leading `?`
    pub fn encode(&self) -> HarnessResult<String> {
        match self {
            QueryParams::Raw(raw) => Ok(raw.strip_prefix('?').unwrap_or(raw).to_string()),
            QueryParams::Pairs(pairs) => encode_pairs(pairs),
            QueryParams::Map(map) => {
                let pairs: Vec<(String, String)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), primitive_to_string(v)))
                    .collect();
                encode_pairs(&pairs)
            }
        }
    }
}

impl From<&str> for QueryParams {
    fn from(raw: &str) -> Self {
        QueryParams::Raw(raw.to_string())
    }
}

impl From<Map<String, Value>> for QueryParams {
    fn from(map: Map<String, Value>) -> Self {
        QueryParams::Map(map)
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> HarnessResult<String> {
    serde_urlencoded::to_string(pairs)
        .map_err(|e| HarnessError::Config(format!("cannot encode query parameters: {}", e)))
}

/// String form of a JSON value the way a JS `String(value)` renders it
pub fn primitive_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
                integral_to_string(f).unwrap_or_else(|| n.to_string())
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => primitive_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Integral float below 1e21 in plain digits: shortest round-trip
/// mantissa padded with zeros, so `1e20` is `100000000000000000000`
fn integral_to_string(f: f64) -> Option<String> {
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e')?;
    let exp: usize = exp.parse().ok()?;
    let mut digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    while digits.len() < exp + 1 {
        digits.push('0');
    }
    if f < 0.0 {
        digits.insert(0, '-');
    }
    Some(digits)
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Raw(String),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

/// Everything needed to issue one API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Endpoint path, with or without a leading `/`
    pub path: String,
    pub method: HttpMethod,
    pub headers: Option<BTreeMap<String, String>>,
    pub query: Option<QueryParams>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: None,
            query: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    pub fn query(mut self, query: impl Into<QueryParams>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// `?query` suffix, empty when there is nothing to send
    pub fn query_suffix(&self) -> HarnessResult<String> {
        match &self.query {
            Some(query) => {
                let encoded = query.encode()?;
                if encoded.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("?{}", encoded))
                }
            }
            None => Ok(String::new()),
        }
    }
}

/// Ensure a path starts with exactly one leading `/`
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_normalize_path_is_idempotent() {
        assert_eq!(normalize_path("x"), "/x");
        assert_eq!(normalize_path("/x"), "/x");
        assert_eq!(normalize_path(&normalize_path("users/login")), "/users/login");
    }

    #[test]
    fn test_query_shapes_encode_identically() {
        let map = json!({"a": 1, "b": "x"}).as_object().cloned().unwrap();
        let expected = "a=1&b=x";

        assert_eq!(QueryParams::Map(map).encode().unwrap(), expected);
        assert_eq!(QueryParams::from("a=1&b=x").encode().unwrap(), expected);
        assert_eq!(QueryParams::from("?a=1&b=x").encode().unwrap(), expected);
        assert_eq!(
            QueryParams::pairs([("a", "1"), ("b", "x")]).encode().unwrap(),
            expected
        );
    }

    #[test]
    fn test_query_values_are_escaped() {
        let query = QueryParams::pairs([("q", "a b&c"), ("flag", "true")]);
        assert_eq!(query.encode().unwrap(), "q=a+b%26c&flag=true");
    }

    #[test]
    fn test_primitive_rendering() {
        assert_eq!(primitive_to_string(&json!(true)), "true");
        assert_eq!(primitive_to_string(&json!(2.5)), "2.5");
        assert_eq!(primitive_to_string(&json!(3.0)), "3");
        assert_eq!(primitive_to_string(&json!(null)), "null");
        assert_eq!(primitive_to_string(&json!([1, "a"])), "1,a");
        assert_eq!(primitive_to_string(&json!(-1500.0)), "-1500");
        assert_eq!(primitive_to_string(&json!(-0.0)), "0");
    }

    #[test_case(1e20, "100000000000000000000" ; "above i64 range")]
    #[test_case(9.3e18, "9300000000000000000" ; "just above i64 max")]
    #[test_case(123456789012345680000.0, "123456789012345680000" ; "shortest digits then zeros")]
    #[test_case(9007199254740992.0, "9007199254740992" ; "two to the fifty third")]
    fn test_large_integral_floats(value: f64, expected: &str) {
        assert_eq!(primitive_to_string(&json!(value)), expected);
    }

    #[test]
    fn test_absent_or_empty_query_has_no_question_mark() {
        assert_eq!(ApiRequest::get("users").query_suffix().unwrap(), "");
        assert_eq!(ApiRequest::get("users").query("").query_suffix().unwrap(), "");
        assert_eq!(
            ApiRequest::get("users")
                .query(QueryParams::Map(Map::new()))
                .query_suffix()
                .unwrap(),
            ""
        );
        assert_eq!(
            ApiRequest::get("users").query("page=1").query_suffix().unwrap(),
            "?page=1"
        );
    }

    #[test]
    fn test_builder_collects_headers() {
        let req = ApiRequest::post("articles")
            .header("Authorization", "Token abc")
            .json(json!({"article": {}}));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.headers.unwrap().get("Authorization").map(String::as_str),
            Some("Token abc")
        );
        assert!(matches!(req.body, Some(RequestBody::Json(_))));
    }
}
