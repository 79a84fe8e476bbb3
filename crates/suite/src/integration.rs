//! Integration runner: a live server per invocation, then the test file under node

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::application::Application;
use crate::browser::BrowserDriver;
use crate::config::SuiteConfig;
use crate::error::{SuiteError, SuiteResult};
use crate::result::{TestCategory, TestResult};
use crate::runner::{outcome_to_result, Runner};
use crate::server::ServerHandle;

/// Environment variable carrying the live server's URL into the test
pub const BASE_URL_ENV: &str = "GAUNTLET_BASE_URL";

pub struct IntegrationRunner {
    app: Arc<dyn Application>,
    files: Vec<PathBuf>,
    config: Arc<SuiteConfig>,
}

impl IntegrationRunner {
    pub fn new(app: Arc<dyn Application>, file: PathBuf, config: Arc<SuiteConfig>) -> Self {
        Self {
            app,
            files: vec![file],
            config,
        }
    }
}

#[async_trait]
impl Runner for IntegrationRunner {
    fn category(&self) -> TestCategory {
        TestCategory::Integration
    }

    fn files(&self) -> &[PathBuf] {
        &self.files
    }

    async fn run(&mut self) -> SuiteResult<TestResult> {
        let start = Instant::now();
        let file = &self.files[0];
        let root = self.app.root();

        let path = root.join(file);
        if !path.is_file() {
            return Err(SuiteError::Runner {
                file: file.display().to_string(),
                reason: "test file not found".to_string(),
            });
        }

        let settings = self.config.runner.settings_for(TestCategory::Integration);
        let driver = BrowserDriver::new(&settings);
        driver.check_installed()?;

        let mut server = ServerHandle::spawn(&self.config.server, root).await?;

        let mut env = BTreeMap::new();
        env.insert(BASE_URL_ENV.to_string(), server.base_url().to_string());
        let outcome = driver.run_file(&path, root, &env).await;

        server.stop()?;

        Ok(outcome_to_result(file, TestCategory::Integration, outcome?, start.elapsed()))
    }
}
