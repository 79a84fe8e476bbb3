//! Suite configuration
//!
//! Every section is a plain immutable value handed to constructors. Layering
//! happens through explicit merge functions: file config over defaults, CLI
//! overrides over file config, and per-variant runner overlays over the
//! shared `[runner.defaults]` section.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::browser::Browser;
use crate::error::SuiteResult;
use crate::result::TestCategory;
use crate::server::ServerConfig;

/// Config file looked up in the application root
pub const CONFIG_FILE_NAME: &str = "gauntlet.toml";

/// Staged unit test root, relative to the application root
pub const TEST_ROOT_DIR: &str = "tmp/test_root";

/// Generated unit harness pages, relative to the application root
pub const HARNESS_DIR: &str = "tmp/harness";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuiteConfig {
    /// Perform setup only, never invoke a runner
    pub dry_run: bool,

    /// Where `test-results.json` is written
    pub output_dir: PathBuf,

    pub app: AppConfig,
    pub pipeline: PipelineConfig,
    pub runner: RunnerSection,
    pub server: ServerConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            output_dir: PathBuf::from("test-results"),
            app: AppConfig::default(),
            pipeline: PipelineConfig::default(),
            runner: RunnerSection::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Application build settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Name of the compiled site directory beneath the app root
    pub site_dir: String,

    /// Build command (argv), run in the app root. Empty means nothing to build.
    pub build_command: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_dir: "site".to_string(),
            build_command: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
        }
    }
}

/// Staging pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extension of test sources that need compiling
    pub source_ext: String,

    /// Extension of compiled scripts
    pub target_ext: String,

    /// Compiler argv; the source path is appended and stdout is the output
    pub compiler: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_ext: "coffee".to_string(),
            target_ext: "js".to_string(),
            compiler: vec!["coffee".to_string(), "--print".to_string(), "--bare".to_string()],
        }
    }
}

/// Settings every runner variant sees after merging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerSettings {
    /// Node executable used to drive the browser
    pub node: String,

    pub browser: Browser,

    pub headless: bool,

    /// Upper bound for one runner invocation
    pub timeout_secs: u64,

    /// Extra environment for spawned processes
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            node: "node".to_string(),
            browser: Browser::Chromium,
            headless: true,
            timeout_secs: 60,
            env: BTreeMap::new(),
        }
    }
}

/// Per-variant overrides; unset fields fall back to the shared defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerOverlay {
    pub node: Option<String>,
    pub browser: Option<Browser>,
    pub headless: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub env: BTreeMap<String, String>,
}

impl RunnerSettings {
    /// Apply `overlay` on top of `base`. Environment maps merge key by key.
    pub fn inherit(base: &RunnerSettings, overlay: &RunnerOverlay) -> RunnerSettings {
        let mut env = base.env.clone();
        env.extend(overlay.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        RunnerSettings {
            node: overlay.node.clone().unwrap_or_else(|| base.node.clone()),
            browser: overlay.browser.unwrap_or(base.browser),
            headless: overlay.headless.unwrap_or(base.headless),
            timeout_secs: overlay.timeout_secs.unwrap_or(base.timeout_secs),
            env,
        }
    }
}

/// The `[runner]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerSection {
    pub defaults: RunnerSettings,
    pub unit: RunnerOverlay,
    pub integration: RunnerOverlay,
}

impl RunnerSection {
    /// Merged settings for one runner variant
    pub fn settings_for(&self, category: TestCategory) -> RunnerSettings {
        match category {
            TestCategory::Unit => RunnerSettings::inherit(&self.defaults, &self.unit),
            TestCategory::Integration => RunnerSettings::inherit(&self.defaults, &self.integration),
        }
    }
}

/// Command-line overrides layered over the loaded config
#[derive(Debug, Clone, Default)]
pub struct ConfigOverlay {
    pub dry_run: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub site_dir: Option<String>,
    pub browser: Option<Browser>,
    pub server_port: Option<u16>,
}

impl SuiteConfig {
    /// Load configuration from file, or defaults if it does not exist
    pub fn load(path: &Path) -> SuiteResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load `gauntlet.toml` from an application root
    pub fn load_from_root(root: &Path) -> SuiteResult<Self> {
        Self::load(&root.join(CONFIG_FILE_NAME))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> SuiteResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Layer command-line overrides over this config
    pub fn merge(mut self, overlay: &ConfigOverlay) -> Self {
        if let Some(dry_run) = overlay.dry_run {
            self.dry_run = dry_run;
        }
        if let Some(dir) = &overlay.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(site_dir) = &overlay.site_dir {
            self.app.site_dir = site_dir.clone();
        }
        if let Some(browser) = overlay.browser {
            self.runner.defaults.browser = browser;
        }
        if let Some(port) = overlay.server_port {
            self.server.port = Some(port);
        }
        self
    }

    pub fn test_root(&self, app_root: &Path) -> PathBuf {
        app_root.join(TEST_ROOT_DIR)
    }

    pub fn harness_dir(&self, app_root: &Path) -> PathBuf {
        app_root.join(HARNESS_DIR)
    }
}
