//! Declarative UI steps and YAML scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use playtype_common::{HarnessError, HarnessResult};

/// A UI flow parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiScenario {
    /// Unique name for this scenario
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering, e.g. `UI` or `smoke`
    #[serde(default)]
    pub tags: Vec<String>,

    /// Page to open before the first step, relative to the dashboard URL
    #[serde(default)]
    pub start_url: Option<String>,

    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    pub steps: Vec<UiStep>,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        default_viewport()
    }
}

/// A single browser action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiStep {
    /// Go to a URL; relative URLs are resolved against the base URL
    Navigate { url: String },

    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    Dblclick { selector: String },

    /// Clear and fill an input
    Fill { selector: String, value: String },

    /// Type character by character
    Type {
        selector: String,
        text: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },

    /// Press a key on an element, or on the page when no selector is given
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    Check { selector: String },

    Uncheck { selector: String },

    /// Select a dropdown option by value
    Select { selector: String, value: String },

    Hover { selector: String },

    /// Drag `source` onto `target`
    Drag { source: String, target: String },

    Focus { selector: String },

    /// Scroll the element into view if needed
    Scroll { selector: String },

    WaitFor {
        selector: String,
        #[serde(default)]
        state: WaitState,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    WaitForLoadState {
        #[serde(default)]
        state: LoadState,
    },

    WaitForResponse { url: String },

    WaitForRequest { url: String },

    /// Fixed wait; prefer `wait_for`
    Sleep { ms: u64 },

    Screenshot {
        path: String,
        #[serde(default)]
        full_page: bool,
    },

    Upload { selector: String, file: String },

    /// Handle the next dialog; `response` defaults to accept
    Dialog {
        #[serde(default)]
        response: DialogAction,
    },

    /// Answer matching requests with a canned response
    RouteFulfill {
        url: String,
        #[serde(default = "default_status")]
        status: u16,
        #[serde(default = "default_content_type")]
        content_type: String,
        body: serde_json::Value,
    },

    RouteAbort { url: String },

    RouteContinue { url: String },

    Unroute { url: String },

    /// Record an element's text content under `key`
    ReadText { selector: String, key: String },

    /// Record the number of matching elements under `key`
    Count { selector: String, key: String },

    Log { message: String },

    /// Open the Playwright inspector
    Pause,
}

fn default_wait_timeout() -> u64 {
    5000
}

fn default_status() -> u16 {
    200
}

fn default_content_type() -> String {
    "application/json".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Load,
    #[default]
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogAction {
    #[default]
    Accept,
    Dismiss,
}

impl UiStep {
    /// Short label used in logs and generated script comments
    pub fn name(&self) -> String {
        match self {
            UiStep::Navigate { url } => format!("navigate:{}", url),
            UiStep::Click { selector, .. } => format!("click:{}", selector),
            UiStep::Dblclick { selector } => format!("dblclick:{}", selector),
            UiStep::Fill { selector, .. } => format!("fill:{}", selector),
            UiStep::Type { selector, .. } => format!("type:{}", selector),
            UiStep::Press { key, .. } => format!("press:{}", key),
            UiStep::Check { selector } => format!("check:{}", selector),
            UiStep::Uncheck { selector } => format!("uncheck:{}", selector),
            UiStep::Select { selector, .. } => format!("select:{}", selector),
            UiStep::Hover { selector } => format!("hover:{}", selector),
            UiStep::Drag { source, target } => format!("drag:{}->{}", source, target),
            UiStep::Focus { selector } => format!("focus:{}", selector),
            UiStep::Scroll { selector } => format!("scroll:{}", selector),
            UiStep::WaitFor { selector, state, .. } => {
                format!("wait_for:{}:{}", selector, state.as_str())
            }
            UiStep::WaitForLoadState { state } => format!("wait_for_load_state:{}", state.as_str()),
            UiStep::WaitForResponse { url } => format!("wait_for_response:{}", url),
            UiStep::WaitForRequest { url } => format!("wait_for_request:{}", url),
            UiStep::Sleep { ms } => format!("sleep:{}ms", ms),
            UiStep::Screenshot { path, .. } => format!("screenshot:{}", path),
            UiStep::Upload { selector, .. } => format!("upload:{}", selector),
            UiStep::Dialog { response } => format!("dialog:{:?}", response).to_lowercase(),
            UiStep::RouteFulfill { url, status, .. } => format!("route_fulfill:{}:{}", url, status),
            UiStep::RouteAbort { url } => format!("route_abort:{}", url),
            UiStep::RouteContinue { url } => format!("route_continue:{}", url),
            UiStep::Unroute { url } => format!("unroute:{}", url),
            UiStep::ReadText { key, .. } => format!("read_text:{}", key),
            UiStep::Count { key, .. } => format!("count:{}", key),
            UiStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
            UiStep::Pause => "pause".to_string(),
        }
    }
}

impl UiScenario {
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(HarnessError::Config(format!(
                "scenario '{}' has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load every `.yaml`/`.yml` scenario under `dir`, sorted by path
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        let mut files: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        files.iter().map(|path| Self::from_file(path)).collect()
    }

    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}
