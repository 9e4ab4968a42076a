//! PlayType API/UI test harness
//!
//! This crate provides the building blocks tests use to exercise a REST
//! API and a web dashboard on a staging environment:
//! - An HTTP client with request/response logging
//! - Schema, type and field-path validation of responses
//! - Endpoint services with assertion helpers
//! - Database lookups, optionally through an SSH tunnel
//! - Playwright-driven page objects
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Test (cargo test)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  lifecycle::global_setup / global_teardown                  │
//! │  TestContext                                                │
//! │    ├── client: ApiClient ── call_api(ApiRequest)            │
//! │    ├── validator: ResponseValidator                         │
//! │    │     ├── validate_schema / validate_type                │
//! │    │     └── validate_field / validate_text                 │
//! │    ├── realworld: RealWorldService (BaseService)            │
//! │    └── db: DatabaseService ── SshTunnel (per query)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ui                                                         │
//! │    ├── PageManager -> CreateQuestPage / UpdateQuestPage     │
//! │    ├── PageActions (recorded UiStep list)                   │
//! │    └── BrowserSession -> node + playwright                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod context;
pub mod db;
pub mod lifecycle;
pub mod ui;

pub use api::{ApiClient, ApiRequest, ApiResponse, HttpMethod, Mismatch, ResponseValidator};
pub use context::TestContext;
pub use db::{DatabaseService, DbKind, DbRow};
pub use ui::{BrowserSession, PageManager, UiScenario, UiStep};
