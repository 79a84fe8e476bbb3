//! CLI Commands

pub mod list;
pub mod stage;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use gauntlet_suite::SuiteConfig;

use crate::output::OutputFormat;

/// At least one test ran and failed
pub const EXIT_TEST_FAILED: i32 = 1;
/// Configuration, compilation or staging failed before tests could run
pub const EXIT_SETUP_FAILED: i32 = 2;

/// Everything a command needs from the global flags
pub struct Context {
    pub root: PathBuf,
    pub config: SuiteConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("application root {} not found", root.display()))?;

        let config = match config_path {
            Some(path) => SuiteConfig::load(path),
            None => SuiteConfig::load_from_root(&root),
        }
        .context("failed to load configuration")?;

        Ok(Self { root, config, format })
    }

    /// Expand `patterns` (or the default test patterns) against the root
    pub fn select_files(&self, patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
        if patterns.is_empty() {
            expand_globs(&self.root, &default_patterns(&self.config))
        } else {
            expand_globs(&self.root, patterns)
        }
    }
}

pub fn default_patterns(config: &SuiteConfig) -> Vec<String> {
    let mut patterns = vec![format!("test/**/*_test.{}", config.pipeline.target_ext)];
    if config.pipeline.source_ext != config.pipeline.target_ext {
        patterns.push(format!("test/**/*_test.{}", config.pipeline.source_ext));
    }
    patterns
}

/// Files matching any pattern, relative to `root`, first match order, no duplicates
pub fn expand_globs(root: &Path, patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let full = root.join(pattern);
        let full = full.to_string_lossy();
        for entry in glob::glob(&full).with_context(|| format!("invalid glob: {}", pattern))? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            if seen.insert(rel.clone()) {
                files.push(rel);
            }
        }
    }

    Ok(files)
}
