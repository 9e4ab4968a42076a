//! REST API client, validation and services

pub mod client;
pub mod path;
pub mod payload;
pub mod request;
pub mod response;
pub mod schemas;
pub mod service;
pub mod services;
pub mod validator;

pub use client::ApiClient;
pub use request::{normalize_path, ApiRequest, HttpMethod, QueryParams, RequestBody};
pub use response::{ApiResponse, ResponseBody};
pub use service::BaseService;
pub use validator::{FieldIssue, Mismatch, ResponseValidator, TypeSchema};
