//! Reusable page actions
//!
//! `PageActions` records steps; page objects borrow it and add
//! page-specific flows on top.

use serde_json::Value;

use playtype_common::HarnessResult;

use super::browser::{BrowserSession, PageOutput};
use super::spec::{DialogAction, LoadState, UiStep, WaitState};

const DEFAULT_WAIT_MS: u64 = 5000;

#[derive(Debug, Clone, Default)]
pub struct PageActions {
    steps: Vec<UiStep>,
}

impl PageActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[UiStep] {
        &self.steps
    }

    pub fn push(&mut self, step: UiStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn navigate(&mut self, url: &str) -> &mut Self {
        self.push(UiStep::Navigate {
            url: url.to_string(),
        })
    }

    pub fn click(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Click {
            selector: selector.to_string(),
            timeout_ms: None,
        })
    }

    pub fn dblclick(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Dblclick {
            selector: selector.to_string(),
        })
    }

    pub fn fill(&mut self, selector: &str, text: &str) -> &mut Self {
        self.push(UiStep::Fill {
            selector: selector.to_string(),
            value: text.to_string(),
        })
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> &mut Self {
        self.push(UiStep::Type {
            selector: selector.to_string(),
            text: text.to_string(),
            delay_ms: None,
        })
    }

    pub fn press(&mut self, selector: &str, key: &str) -> &mut Self {
        self.push(UiStep::Press {
            selector: Some(selector.to_string()),
            key: key.to_string(),
        })
    }

    pub fn check(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Check {
            selector: selector.to_string(),
        })
    }

    pub fn uncheck(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Uncheck {
            selector: selector.to_string(),
        })
    }

    pub fn select_option_by_value(&mut self, selector: &str, value: &str) -> &mut Self {
        self.push(UiStep::Select {
            selector: selector.to_string(),
            value: value.to_string(),
        })
    }

    pub fn hover(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Hover {
            selector: selector.to_string(),
        })
    }

    pub fn drag_to(&mut self, source: &str, target: &str) -> &mut Self {
        self.push(UiStep::Drag {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    pub fn focus(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Focus {
            selector: selector.to_string(),
        })
    }

    pub fn scroll_into_view(&mut self, selector: &str) -> &mut Self {
        self.push(UiStep::Scroll {
            selector: selector.to_string(),
        })
    }

    pub fn wait_for_visible(&mut self, selector: &str) -> &mut Self {
        self.wait_for(selector, WaitState::Visible, DEFAULT_WAIT_MS)
    }

    pub fn wait_for_attached(&mut self, selector: &str) -> &mut Self {
        self.wait_for(selector, WaitState::Attached, DEFAULT_WAIT_MS)
    }

    pub fn wait_for(&mut self, selector: &str, state: WaitState, timeout_ms: u64) -> &mut Self {
        self.push(UiStep::WaitFor {
            selector: selector.to_string(),
            state,
            timeout_ms,
        })
    }

    /// Wait for network idle
    pub fn wait_for_page_load_idle(&mut self) -> &mut Self {
        self.push(UiStep::WaitForLoadState {
            state: LoadState::NetworkIdle,
        })
    }

    /// Wait for DOMContentLoaded
    pub fn wait_for_page_load_dom(&mut self) -> &mut Self {
        self.push(UiStep::WaitForLoadState {
            state: LoadState::DomContentLoaded,
        })
    }

    pub fn wait_for_seconds(&mut self, seconds: u64) -> &mut Self {
        self.push(UiStep::Sleep { ms: seconds * 1000 })
    }

    pub fn wait_for_response(&mut self, url: &str) -> &mut Self {
        self.push(UiStep::WaitForResponse {
            url: url.to_string(),
        })
    }

    pub fn wait_for_request(&mut self, url: &str) -> &mut Self {
        self.push(UiStep::WaitForRequest {
            url: url.to_string(),
        })
    }

    /// Record the element text under `key`
    pub fn read_text(&mut self, selector: &str, key: &str) -> &mut Self {
        self.push(UiStep::ReadText {
            selector: selector.to_string(),
            key: key.to_string(),
        })
    }

    /// Record the number of matching elements under `key`; zero means absent
    pub fn count(&mut self, selector: &str, key: &str) -> &mut Self {
        self.push(UiStep::Count {
            selector: selector.to_string(),
            key: key.to_string(),
        })
    }

    pub fn upload_file(&mut self, selector: &str, path: &str) -> &mut Self {
        self.push(UiStep::Upload {
            selector: selector.to_string(),
            file: path.to_string(),
        })
    }

    pub fn screenshot(&mut self, path: &str) -> &mut Self {
        self.push(UiStep::Screenshot {
            path: path.to_string(),
            full_page: false,
        })
    }

    pub fn dialog(&mut self, response: DialogAction) -> &mut Self {
        self.push(UiStep::Dialog { response })
    }

    pub fn fulfill_route(&mut self, url: &str, body: Value, status: u16) -> &mut Self {
        self.push(UiStep::RouteFulfill {
            url: url.to_string(),
            status,
            content_type: "application/json".to_string(),
            body,
        })
    }

    pub fn abort_route(&mut self, url: &str) -> &mut Self {
        self.push(UiStep::RouteAbort {
            url: url.to_string(),
        })
    }

    pub fn continue_route(&mut self, url: &str) -> &mut Self {
        self.push(UiStep::RouteContinue {
            url: url.to_string(),
        })
    }

    pub fn unroute(&mut self, url: &str) -> &mut Self {
        self.push(UiStep::Unroute {
            url: url.to_string(),
        })
    }

    pub fn log(&mut self, message: &str) -> &mut Self {
        self.push(UiStep::Log {
            message: message.to_string(),
        })
    }

    pub fn pause(&mut self) -> &mut Self {
        self.push(UiStep::Pause)
    }

    /// Run all recorded steps and clear the recording
    pub async fn run(&mut self, session: &BrowserSession) -> HarnessResult<PageOutput> {
        let steps = std::mem::take(&mut self.steps);
        session.run(&steps).await
    }
}
