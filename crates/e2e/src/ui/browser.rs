//! Playwright browser sessions
//!
//! Steps are compiled into a standalone Node script that drives
//! Playwright. Values read from the page come back as JSON lines on
//! stdout of the form `{"key": ..., "value": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use playtype_common::{HarnessConfig, HarnessError, HarnessResult};

use super::spec::{DialogAction, UiScenario, UiStep, Viewport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(HarnessError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Logged-in dashboard state applied before the first page load
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    /// localStorage key the app reads its session from
    pub storage_key: String,
    pub storage_value: Value,
    /// Value of the `access_token` cookie
    pub token: String,
    pub cookie_domain: String,
}

impl AuthState {
    /// Auth state from config, if both a storage key and a token are set
    pub fn from_config(config: &HarnessConfig) -> Option<Self> {
        let key = config.auth.key.clone().filter(|k| !k.is_empty())?;
        let token = config.auth.token.clone().filter(|t| !t.is_empty())?;
        Some(Self {
            storage_key: key,
            storage_value: config.auth.storage_state(),
            token,
            cookie_domain: config.dashboard_domain.clone(),
        })
    }
}

/// Configuration for a browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    pub auth: Option<AuthState>,
    /// `node_modules` directory that provides the `playwright` package
    pub node_modules: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            auth: None,
            node_modules: local_node_modules(),
        }
    }
}

impl BrowserConfig {
    /// Dashboard session described by the harness config
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            base_url: config.dashboard_url.clone(),
            headless: config.headless,
            auth: AuthState::from_config(config),
            ..Self::default()
        }
    }
}

fn local_node_modules() -> Option<PathBuf> {
    let dir = std::env::current_dir().ok()?.join("node_modules");
    dir.is_dir().then_some(dir)
}

/// Values collected while running steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutput {
    pub values: BTreeMap<String, Value>,
}

impl PageOutput {
    /// Collect `{"key", "value"}` records from script stdout; other lines are ignored
    pub fn parse(stdout: &str) -> Self {
        let mut values = BTreeMap::new();
        for line in stdout.lines() {
            let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line.trim()) else {
                continue;
            };
            if let (Some(Value::String(key)), Some(value)) = (record.get("key"), record.get("value")) {
                values.insert(key.clone(), value.clone());
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn count(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_u64)
    }
}

/// Browser session that runs step lists through Playwright
pub struct BrowserSession {
    config: BrowserConfig,
}

impl BrowserSession {
    /// Create a session after checking that Playwright is installed
    pub fn new(config: BrowserConfig) -> HarnessResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self { config })
    }

    /// Create a session without probing for Playwright
    pub fn unchecked(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn check_playwright_installed() -> HarnessResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    /// Run a scenario, opening its start URL first
    pub async fn run_scenario(&self, scenario: &UiScenario) -> HarnessResult<PageOutput> {
        info!("Running UI scenario: {}", scenario.name);
        let mut steps = Vec::with_capacity(scenario.steps.len() + 1);
        if let Some(url) = &scenario.start_url {
            steps.push(UiStep::Navigate { url: url.clone() });
        }
        steps.extend(scenario.steps.iter().cloned());

        let session = BrowserSession::unchecked(BrowserConfig {
            viewport: scenario.viewport,
            ..self.config.clone()
        });
        session.run(&steps).await
    }

    /// Execute `steps` in one browser and collect read values
    pub async fn run(&self, steps: &[UiStep]) -> HarnessResult<PageOutput> {
        let script = self.build_script(steps);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("steps.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut command = TokioCommand::new("node");
        command.arg(&script_path);
        if let Some(modules) = &self.config.node_modules {
            command.env("NODE_PATH", modules);
        }
        let output = command.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        for line in stdout.lines().filter(|l| l.starts_with("[TEST]")) {
            info!("{}", line);
        }

        if !output.status.success() {
            if let Some((step, reason)) = failed_step(&stderr) {
                return Err(HarnessError::StepFailed { step, reason });
            }
            return Err(HarnessError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        Ok(PageOutput::parse(&stdout))
    }

    /// Build the Playwright script for a set of steps
    pub fn build_script(&self, steps: &[UiStep]) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const baseUrl = {base_url};
  let currentStep = 'setup';
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport.width,
            height = self.config.viewport.height,
            base_url = js(&self.config.base_url),
        ));

        if let Some(auth) = &self.config.auth {
            script.push_str(&auth_to_js(auth));
        }

        script.push_str(
            r#"
  const page = await context.newPage();

  try {
"#,
        );

        for (i, step) in steps.iter().enumerate() {
            let name = step.name();
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, name));
            script.push_str(&format!("    currentStep = {};\n", js(&name)));
            script.push_str(&step_to_js(step));
            script.push('\n');
        }

        script.push_str(
            r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.error(JSON.stringify({ success: false, step: currentStep, error: error.message }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
        );

        script
    }
}

/// JSON string literal, which is also a valid JS string literal
fn js(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn auth_to_js(auth: &AuthState) -> String {
    let mut storage = Map::new();
    storage.insert(auth.storage_key.clone(), auth.storage_value.clone());
    let cookie = json!([{
        "name": "access_token",
        "value": auth.token,
        "domain": auth.cookie_domain,
        "httpOnly": true,
        "secure": true,
        "path": "/",
        "sameSite": "Lax"
    }]);

    format!(
        r#"
  await context.addInitScript((data) => {{
    for (const key in data) {{
      window.localStorage.setItem(key, JSON.stringify(data[key]));
    }}
  }}, {storage});
  await context.addCookies({cookie});
"#,
        storage = Value::Object(storage),
        cookie = cookie,
    )
}

fn step_to_js(step: &UiStep) -> String {
    match step {
        UiStep::Navigate { url } => {
            format!("    await page.goto(new URL({}, baseUrl).toString());", js(url))
        }
        UiStep::Click {
            selector,
            timeout_ms,
        } => format!(
            "    await page.locator({}).click({{ timeout: {} }});",
            js(selector),
            timeout_ms.unwrap_or(5000)
        ),
        UiStep::Dblclick { selector } => {
            format!("    await page.locator({}).dblclick();", js(selector))
        }
        UiStep::Fill { selector, value } => {
            format!("    await page.locator({}).fill({});", js(selector), js(value))
        }
        UiStep::Type {
            selector,
            text,
            delay_ms,
        } => format!(
            "    await page.locator({}).pressSequentially({}, {{ delay: {} }});",
            js(selector),
            js(text),
            delay_ms.unwrap_or(50)
        ),
        UiStep::Press { selector, key } => match selector {
            Some(sel) => format!("    await page.locator({}).press({});", js(sel), js(key)),
            None => format!("    await page.keyboard.press({});", js(key)),
        },
        UiStep::Check { selector } => format!("    await page.locator({}).check();", js(selector)),
        UiStep::Uncheck { selector } => {
            format!("    await page.locator({}).uncheck();", js(selector))
        }
        UiStep::Select { selector, value } => format!(
            "    await page.locator({}).selectOption({{ value: {} }});",
            js(selector),
            js(value)
        ),
        UiStep::Hover { selector } => format!("    await page.locator({}).hover();", js(selector)),
        UiStep::Drag { source, target } => format!(
            "    await page.locator({}).dragTo(page.locator({}));",
            js(source),
            js(target)
        ),
        UiStep::Focus { selector } => format!("    await page.locator({}).focus();", js(selector)),
        UiStep::Scroll { selector } => format!(
            "    await page.locator({}).scrollIntoViewIfNeeded();",
            js(selector)
        ),
        UiStep::WaitFor {
            selector,
            state,
            timeout_ms,
        } => format!(
            "    await page.locator({}).waitFor({{ state: '{}', timeout: {} }});",
            js(selector),
            state.as_str(),
            timeout_ms
        ),
        UiStep::WaitForLoadState { state } => {
            format!("    await page.waitForLoadState('{}');", state.as_str())
        }
        UiStep::WaitForResponse { url } => format!("    await page.waitForResponse({});", js(url)),
        UiStep::WaitForRequest { url } => format!("    await page.waitForRequest({});", js(url)),
        UiStep::Sleep { ms } => format!("    await page.waitForTimeout({});", ms),
        UiStep::Screenshot { path, full_page } => format!(
            "    await page.screenshot({{ path: {}, fullPage: {} }});",
            js(path),
            full_page
        ),
        UiStep::Upload { selector, file } => format!(
            "    await page.setInputFiles({}, {});",
            js(selector),
            js(file)
        ),
        UiStep::Dialog { response } => {
            let call = match response {
                DialogAction::Accept => "accept",
                DialogAction::Dismiss => "dismiss",
            };
            format!(
                "    page.once('dialog', async (dialog) => {{\n      console.log('[TEST] Handling dialog: ' + dialog.message());\n      await dialog.{}();\n    }});",
                call
            )
        }
        UiStep::RouteFulfill {
            url,
            status,
            content_type,
            body,
        } => {
            let body = match body {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "    await page.route({}, (route) => route.fulfill({{ status: {}, contentType: {}, body: {} }}));",
                js(url),
                status,
                js(content_type),
                js(&body)
            )
        }
        UiStep::RouteAbort { url } => {
            format!("    await page.route({}, (route) => route.abort());", js(url))
        }
        UiStep::RouteContinue { url } => {
            format!("    await page.route({}, (route) => route.continue());", js(url))
        }
        UiStep::Unroute { url } => format!("    await page.unroute({});", js(url)),
        UiStep::ReadText { selector, key } => format!(
            "    console.log(JSON.stringify({{ key: {}, value: await page.locator({}).textContent() }}));",
            js(key),
            js(selector)
        ),
        UiStep::Count { selector, key } => format!(
            "    console.log(JSON.stringify({{ key: {}, value: await page.locator({}).count() }}));",
            js(key),
            js(selector)
        ),
        UiStep::Log { message } => format!("    console.log({});", js(&format!("[TEST] {}", message))),
        UiStep::Pause => "    await page.pause();".to_string(),
    }
}

fn failed_step(stderr: &str) -> Option<(String, String)> {
    stderr.lines().rev().find_map(|line| {
        let record: Value = serde_json::from_str(line.trim()).ok()?;
        let step = record.get("step")?.as_str()?.to_string();
        let reason = record
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        Some((step, reason))
    })
}
