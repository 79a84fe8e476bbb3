//! Headless browser automation through Playwright scripts run by node
//!
//! Scripts report back by printing one line of JSON prefixed with
//! [`REPORT_PREFIX`]; everything else on stdout is treated as test chatter.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::config::RunnerSettings;
use crate::error::{SuiteError, SuiteResult};
use crate::result::AssertionResult;

/// Marks the report line in script output
pub const REPORT_PREFIX: &str = "GAUNTLET_REPORT ";

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

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Browser {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(SuiteError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Parsed report line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptReport {
    pub success: bool,
    #[serde(default)]
    pub assertions: Vec<AssertionResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What came back from one node process
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub exit_success: bool,
    pub report: Option<ScriptReport>,
    pub stdout: String,
    pub stderr: String,
}

/// Find the last report line in `stdout`
pub fn parse_report(stdout: &str) -> SuiteResult<Option<ScriptReport>> {
    match stdout.lines().rev().find_map(|line| line.trim().strip_prefix(REPORT_PREFIX)) {
        Some(json) => Ok(Some(serde_json::from_str(json)?)),
        None => Ok(None),
    }
}

/// Drives node/Playwright for one runner invocation
pub struct BrowserDriver {
    node: String,
    browser: Browser,
    headless: bool,
    timeout: Duration,
    env: BTreeMap<String, String>,
}

impl BrowserDriver {
    pub fn new(settings: &RunnerSettings) -> Self {
        Self {
            node: settings.node.clone(),
            browser: settings.browser,
            headless: settings.headless,
            timeout: Duration::from_secs(settings.timeout_secs),
            env: settings.env.clone(),
        }
    }

    /// Check that node can load Playwright
    pub fn check_installed(&self) -> SuiteResult<()> {
        let status = Command::new(&self.node)
            .args(["-e", "require.resolve('playwright')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(SuiteError::BrowserNotFound),
        }
    }

    /// Script that opens a unit harness page and prints its assertion report
    pub fn harness_script(&self, harness_url: &str) -> String {
        format!(
            r#"
const {{ {browser} }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const page = await browser.newPage();
  const pageErrors = [];
  page.on('pageerror', (error) => pageErrors.push(error.message));

  try {{
    await page.goto('{url}');
    await page.waitForFunction(
      () => window.__gauntlet && window.__gauntlet.finished,
      null,
      {{ timeout: {timeout_ms} }}
    );
    const assertions = await page.evaluate(() => window.__gauntlet.assertions);
    for (const message of pageErrors) {{
      assertions.push({{ message: 'uncaught: ' + message, passed: false }});
    }}
    const success = assertions.every((a) => a.passed);
    console.log('{prefix}' + JSON.stringify({{ success, assertions }}));
  }} catch (error) {{
    const report = {{ success: false, assertions: [], error: error.message }};
    console.log('{prefix}' + JSON.stringify(report));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            url = harness_url.replace('\'', "\\'"),
            timeout_ms = self.timeout.as_millis(),
            prefix = REPORT_PREFIX,
        )
    }

    /// Write `script` to a temp file and run it
    pub async fn run_script(&self, script: &str) -> SuiteResult<ScriptOutcome> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("harness.js");
        std::fs::write(&script_path, script)?;

        self.run_file(&script_path, temp_dir.path(), &BTreeMap::new()).await
    }

    /// Run a test file with node, with extra environment on top of the configured one
    pub async fn run_file(
        &self,
        file: &Path,
        cwd: &Path,
        extra_env: &BTreeMap<String, String>,
    ) -> SuiteResult<ScriptOutcome> {
        debug!("Running {} {}", self.node, file.display());

        let mut cmd = TokioCommand::new(&self.node);
        cmd.arg(file)
            .current_dir(cwd)
            .envs(&self.env)
            .envs(extra_env)
            .env("GAUNTLET_BROWSER", self.browser.as_str())
            .env("GAUNTLET_HEADLESS", if self.headless { "1" } else { "0" })
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                SuiteError::Browser(format!(
                    "{} timed out after {}s",
                    file.display(),
                    self.timeout.as_secs()
                ))
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let report = match parse_report(&stdout) {
            Ok(report) => report,
            Err(e) => {
                warn!("Unreadable report from {}: {}", file.display(), e);
                None
            }
        };

        Ok(ScriptOutcome {
            exit_success: output.status.success(),
            report,
            stdout,
            stderr,
        })
    }
}

/// `file://` URL for a local path
pub fn file_url(path: &Path) -> String {
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    format!("file://{}", absolute.to_string_lossy().replace('\\', "/"))
}
