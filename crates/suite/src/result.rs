//! Per-file results and the aggregated suite report

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SuiteResult;

/// Execution category of a test file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Unit,
    Integration,
}

impl TestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Unit => "unit",
            TestCategory::Integration => "integration",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One assertion scraped from a runner's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    pub message: String,
    pub passed: bool,
}

/// Outcome of a single runner invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub file: PathBuf,
    pub category: TestCategory,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub assertions: Vec<AssertionResult>,
    /// Messages of failing assertions
    #[serde(default)]
    pub failures: Vec<String>,
    /// Process-level error, if the runner itself broke
    pub error: Option<String>,
}

impl TestResult {
    pub fn passed(file: impl Into<PathBuf>, category: TestCategory) -> Self {
        Self {
            file: file.into(),
            category,
            success: true,
            duration_ms: 0,
            assertions: vec![],
            failures: vec![],
            error: None,
        }
    }

    /// Failed result for a runner that could not produce one itself
    pub fn errored(file: impl Into<PathBuf>, category: TestCategory, error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::passed(file, category)
        }
    }

    /// Build a result from scraped assertions; fails if any assertion failed
    pub fn from_assertions(
        file: impl Into<PathBuf>,
        category: TestCategory,
        assertions: Vec<AssertionResult>,
    ) -> Self {
        let failures: Vec<String> = assertions
            .iter()
            .filter(|a| !a.passed)
            .map(|a| a.message.clone())
            .collect();

        Self {
            success: failures.is_empty(),
            assertions,
            failures,
            ..Self::passed(file, category)
        }
    }

    /// One-line reason for a failure
    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        match self.failures.as_slice() {
            [] => format!("{} assertion(s) passed", self.assertions.len()),
            [only] => only.clone(),
            [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
        }
    }
}

/// A runner that was constructed for a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedRun {
    pub file: PathBuf,
    pub category: TestCategory,
}

/// Result of running the whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Runners in invocation order
    pub planned: Vec<PlannedRun>,
    /// Results in invocation order; empty for a dry run
    pub results: Vec<TestResult>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl SuiteReport {
    pub fn new(
        started_at: DateTime<Utc>,
        dry_run: bool,
        planned: Vec<PlannedRun>,
        results: Vec<TestResult>,
        duration_ms: u64,
    ) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            started_at,
            dry_run,
            planned,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
            duration_ms,
        }
    }

    /// True iff every recorded result passed
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as `test-results.json` under `dir`
    pub fn write_json(&self, dir: &Path) -> SuiteResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("test-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
