//! Unit runner: one test file in a generated harness page, no live server

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::application::Application;
use crate::browser::{file_url, BrowserDriver};
use crate::config::SuiteConfig;
use crate::error::SuiteResult;
use crate::harness::HarnessBuilder;
use crate::result::{TestCategory, TestResult};
use crate::runner::{outcome_to_result, Runner};

pub struct UnitRunner {
    app: Arc<dyn Application>,
    files: Vec<PathBuf>,
    config: Arc<SuiteConfig>,
}

impl UnitRunner {
    pub fn new(app: Arc<dyn Application>, file: PathBuf, config: Arc<SuiteConfig>) -> Self {
        Self {
            app,
            files: vec![file],
            config,
        }
    }

    /// Where the pipeline put this file inside the test root
    pub fn staged_path(&self, file: &Path) -> PathBuf {
        let pipeline = &self.config.pipeline;
        let rel = file.strip_prefix(self.app.root()).unwrap_or(file);
        if rel.extension().is_some_and(|e| e == pipeline.source_ext.as_str()) {
            rel.with_extension(&pipeline.target_ext)
        } else {
            rel.to_path_buf()
        }
    }
}

#[async_trait]
impl Runner for UnitRunner {
    fn category(&self) -> TestCategory {
        TestCategory::Unit
    }

    fn files(&self) -> &[PathBuf] {
        &self.files
    }

    async fn run(&mut self) -> SuiteResult<TestResult> {
        let start = Instant::now();
        let file = &self.files[0];
        let root = self.app.root();

        let harness = HarnessBuilder::new(
            self.config.test_root(root),
            self.config.harness_dir(root),
            self.config.pipeline.target_ext.clone(),
        );
        let page = harness.write(&self.staged_path(file))?;

        let driver = BrowserDriver::new(&self.config.runner.settings_for(TestCategory::Unit));
        driver.check_installed()?;

        debug!("Loading harness {}", page.display());
        let outcome = driver.run_script(&driver.harness_script(&file_url(&page))).await?;

        Ok(outcome_to_result(file, TestCategory::Unit, outcome, start.elapsed()))
    }
}
