//! Playwright JSON report model
//!
//! Only the fields the exporter reads are modelled. Everything is optional
//! because older reporters omit several of them.

use serde::Deserialize;
use std::path::Path;

use playtype_common::{HarnessError, HarnessResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestReport {
    #[serde(default)]
    pub suites: Vec<Suite>,
}

/// Project- or file-level suite. Specs sit one nesting level below the top.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Suite {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub suites: Vec<Suite>,
    #[serde(default)]
    pub specs: Vec<Spec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub tests: Vec<TestEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestEntry {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub errors: Vec<ReportedError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportedError {
    #[serde(default)]
    pub message: Option<String>,
}

impl TestReport {
    pub fn from_json(data: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        if !path.exists() {
            return Err(HarnessError::ReportNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Every test as `(suite, spec, test)`, walking `suites → suites → specs → tests`
    pub fn tests(&self) -> impl Iterator<Item = (&Suite, &Spec, &TestEntry)> {
        self.suites
            .iter()
            .flat_map(|top| top.suites.iter())
            .flat_map(|suite| suite.specs.iter().map(move |spec| (suite, spec)))
            .flat_map(|(suite, spec)| spec.tests.iter().map(move |test| (suite, spec, test)))
    }
}

/// Empty strings in the report count as missing
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

impl TestEntry {
    /// Status and duration (ms) of the first result, else the test-level values
    pub fn outcome(&self) -> (&str, f64) {
        match self.results.first() {
            Some(result) => (
                non_empty(result.status.as_deref()).unwrap_or("unknown"),
                result.duration.unwrap_or(0.0),
            ),
            None => (
                non_empty(self.status.as_deref()).unwrap_or("unknown"),
                self.duration.unwrap_or(0.0),
            ),
        }
    }

    /// First line of the first error of the first result
    pub fn first_error(&self) -> Option<&str> {
        let result = self.results.first()?;
        let error = result.errors.first()?;
        let message = non_empty(error.message.as_deref()).unwrap_or("unknown_error");
        Some(message.split('\n').next().unwrap_or(message))
    }
}
