//! Suite controller: setup, run every runner in order, teardown
//!
//! ```text
//! Idle -> Setup -> Running    -> Teardown -> Done
//!               \-> SkippedRun -/
//! ```
//!
//! A setup failure (compile or staging) is returned as the suite's error and
//! no runner is built. A runner failure is recorded and the next runner runs.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::application::Application;
use crate::classify::{classify, Classification};
use crate::compiler::CommandCompiler;
use crate::config::SuiteConfig;
use crate::error::SuiteResult;
use crate::pipeline::{Pipeline, StageReport};
use crate::result::{SuiteReport, TestResult};
use crate::runner::{build_runners, BrowserRunnerFactory, Runner, RunnerFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuitePhase {
    Idle,
    Setup,
    Running,
    SkippedRun,
    Teardown,
    Done,
}

pub struct TestSuite {
    app: Arc<dyn Application>,
    files: Vec<PathBuf>,
    config: Arc<SuiteConfig>,
    pipeline: Pipeline,
    factory: Box<dyn RunnerFactory>,
    history: Vec<SuitePhase>,
    stage_report: Option<StageReport>,
}

impl TestSuite {
    pub fn new(
        app: Arc<dyn Application>,
        files: Vec<PathBuf>,
        config: Arc<SuiteConfig>,
        pipeline: Pipeline,
        factory: Box<dyn RunnerFactory>,
    ) -> Self {
        Self {
            app,
            files,
            config,
            pipeline,
            factory,
            history: vec![SuitePhase::Idle],
            stage_report: None,
        }
    }

    /// Suite wired with the configured compiler and the browser runners
    pub fn from_config(
        app: Arc<dyn Application>,
        files: Vec<PathBuf>,
        config: Arc<SuiteConfig>,
    ) -> SuiteResult<Self> {
        let compiler = Arc::new(CommandCompiler::new(&config.pipeline.compiler)?);
        let pipeline = Pipeline::standard(&config.pipeline, &config.app.site_dir, compiler)?;
        let factory = Box::new(BrowserRunnerFactory::new(Arc::clone(&config)));
        Ok(Self::new(app, files, config, pipeline, factory))
    }

    pub fn phase(&self) -> SuitePhase {
        self.history.last().copied().unwrap_or(SuitePhase::Idle)
    }

    /// Every phase entered by the last `run`, starting with `Idle`
    pub fn history(&self) -> &[SuitePhase] {
        &self.history
    }

    /// What the last setup staged, if it staged anything
    pub fn stage_report(&self) -> Option<&StageReport> {
        self.stage_report.as_ref()
    }

    pub fn classification(&self) -> Classification {
        classify(&self.files)
    }

    /// Run the suite. Dry runs stop after building the runners.
    pub async fn run(&mut self) -> SuiteResult<SuiteReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        self.history = vec![SuitePhase::Idle];
        self.stage_report = None;

        let classification = self.classification();
        info!(
            "{} unit and {} integration test file(s)",
            classification.unit.len(),
            classification.integration.len()
        );

        self.enter(SuitePhase::Setup);
        if let Err(e) = self.setup(&classification).await {
            error!("Setup failed: {}", e);
            self.teardown();
            return Err(e);
        }

        let mut runners = build_runners(
            self.factory.as_ref(),
            &self.app,
            &classification.unit,
            &classification.integration,
        );
        let planned = runners.iter().map(|r| r.planned()).collect();

        let results = if self.config.dry_run {
            self.enter(SuitePhase::SkippedRun);
            info!("Dry run: {} runner(s) built, none invoked", runners.len());
            Vec::new()
        } else {
            self.enter(SuitePhase::Running);
            let outcome = AssertUnwindSafe(execute(&mut runners)).catch_unwind().await;
            match outcome {
                Ok(results) => results,
                Err(panic) => {
                    self.teardown();
                    std::panic::resume_unwind(panic);
                }
            }
        };

        self.teardown();

        let duration_ms = start.elapsed().as_millis() as u64;
        let report =
            SuiteReport::new(started_at, self.config.dry_run, planned, results, duration_ms);
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            report.passed, report.failed, report.duration_ms
        );
        Ok(report)
    }

    /// Compile and stage unconditionally, without running anything
    pub async fn stage(&mut self) -> SuiteResult<StageReport> {
        self.app.compile().await?;
        let root = self.app.root();
        self.pipeline
            .stage(root, self.app.site_path(), &self.config.test_root(root))
    }

    async fn setup(&mut self, classification: &Classification) -> SuiteResult<()> {
        info!("Compiling application");
        self.app.compile().await?;

        if classification.unit.is_empty() {
            debug!("No unit tests, skipping staging");
            return Ok(());
        }

        let root = self.app.root();
        let report = self
            .pipeline
            .stage(root, self.app.site_path(), &self.config.test_root(root))?;
        self.stage_report = Some(report);
        Ok(())
    }

    /// Release whatever setup acquired. Nothing is held today; the phase
    /// still runs on every path out of `run`.
    fn teardown(&mut self) {
        self.enter(SuitePhase::Teardown);
        debug!("Teardown complete");
        self.enter(SuitePhase::Done);
    }

    fn enter(&mut self, phase: SuitePhase) {
        debug!("Suite phase {:?} -> {:?}", self.phase(), phase);
        self.history.push(phase);
    }
}

/// Invoke runners one at a time, in order
async fn execute(runners: &mut [Box<dyn Runner>]) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(runners.len());

    for runner in runners.iter_mut() {
        let planned = runner.planned();
        debug!("Running {} ({})", planned.file.display(), planned.category);

        let result = match runner.run().await {
            Ok(mut result) => {
                result.file = planned.file;
                result.category = planned.category;
                result
            }
            Err(e) => TestResult::errored(planned.file, planned.category, e),
        };

        if result.success {
            info!("✓ {} ({} ms)", result.file.display(), result.duration_ms);
        } else {
            error!("✗ {} - {}", result.file.display(), result.summary());
        }
        results.push(result);
    }

    results
}
