//! Runner contract and the factory that binds one runner to each file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::application::Application;
use crate::browser::ScriptOutcome;
use crate::config::SuiteConfig;
use crate::error::SuiteResult;
use crate::integration::IntegrationRunner;
use crate::result::{PlannedRun, TestCategory, TestResult};
use crate::unit::UnitRunner;

/// Executes exactly one test file
#[async_trait]
pub trait Runner: Send {
    fn category(&self) -> TestCategory;

    /// Always a single file
    fn files(&self) -> &[PathBuf];

    /// Run the file. An `Err` means the automation itself broke; the caller
    /// records it as a failed result.
    async fn run(&mut self) -> SuiteResult<TestResult>;

    fn planned(&self) -> PlannedRun {
        PlannedRun {
            file: self.files().first().cloned().unwrap_or_default(),
            category: self.category(),
        }
    }
}

/// Builds runners of each variant
pub trait RunnerFactory: Send + Sync {
    fn unit(&self, app: Arc<dyn Application>, file: PathBuf) -> Box<dyn Runner>;
    fn integration(&self, app: Arc<dyn Application>, file: PathBuf) -> Box<dyn Runner>;
}

/// One runner per file: every unit runner first, then every integration runner,
/// each group in input order.
pub fn build_runners(
    factory: &dyn RunnerFactory,
    app: &Arc<dyn Application>,
    unit: &[PathBuf],
    integration: &[PathBuf],
) -> Vec<Box<dyn Runner>> {
    let unit_runners = unit.iter().map(|file| factory.unit(Arc::clone(app), file.clone()));
    let integration_runners = integration
        .iter()
        .map(|file| factory.integration(Arc::clone(app), file.clone()));
    unit_runners.chain(integration_runners).collect()
}

/// Produces the browser-driven unit and integration runners
pub struct BrowserRunnerFactory {
    config: Arc<SuiteConfig>,
}

impl BrowserRunnerFactory {
    pub fn new(config: Arc<SuiteConfig>) -> Self {
        Self { config }
    }
}

impl RunnerFactory for BrowserRunnerFactory {
    fn unit(&self, app: Arc<dyn Application>, file: PathBuf) -> Box<dyn Runner> {
        Box::new(UnitRunner::new(app, file, Arc::clone(&self.config)))
    }

    fn integration(&self, app: Arc<dyn Application>, file: PathBuf) -> Box<dyn Runner> {
        Box::new(IntegrationRunner::new(app, file, Arc::clone(&self.config)))
    }
}

/// Turn a finished node process into a result
pub(crate) fn outcome_to_result(
    file: &Path,
    category: TestCategory,
    outcome: ScriptOutcome,
    elapsed: Duration,
) -> TestResult {
    let mut result = match outcome.report {
        Some(report) => {
            let mut result = TestResult::from_assertions(file, category, report.assertions);
            if !report.success {
                result.success = false;
            }
            result.error = report.error;
            result
        }
        None if outcome.exit_success => TestResult::passed(file, category),
        None => TestResult::errored(file, category, "exited without a report"),
    };

    if !outcome.exit_success {
        result.success = false;
        if result.error.is_none() {
            let stderr = outcome.stderr.trim();
            result.error = Some(if stderr.is_empty() {
                "process exited with failure".to_string()
            } else {
                stderr.to_string()
            });
        }
    }

    result.duration_ms = elapsed.as_millis() as u64;
    result
}
