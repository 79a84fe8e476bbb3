//! Builds the unit test root from the application tree
//!
//! The pipeline is an ordered rule table. Each rule pairs a glob with a
//! transform; every rule a file matches yields its own artifact, and a file
//! matching no rule is left out of the test root. Integration tests are never
//! staged: unit harnesses have no use for them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::classify::category_of;
use crate::compiler::ScriptCompiler;
use crate::config::PipelineConfig;
use crate::error::{StagingError, SuiteError, SuiteResult};
use crate::result::TestCategory;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Which tree a rule's pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Paths relative to the application root
    App,
    /// Paths under the site output, prefixed with the configured site directory
    Site,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Compile the source; output keeps its path with the extension swapped
    CompileScript { target_ext: String },
    /// Byte copy to the same relative path
    Copy,
    /// Byte copy with a leading directory stripped from the destination
    CopyStripPrefix(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PipelineRule {
    pub pattern: Pattern,
    pub scope: Scope,
    pub transform: Transform,
}

impl PipelineRule {
    pub fn new(pattern: &str, scope: Scope, transform: Transform) -> SuiteResult<Self> {
        Ok(Self {
            pattern: Pattern::new(pattern)?,
            scope,
            transform,
        })
    }

    fn matches(&self, scope: Scope, rel: &Path) -> bool {
        self.scope == scope && self.pattern.matches_path_with(rel, MATCH_OPTIONS)
    }
}

/// One file written into the test root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedArtifact {
    /// Source path relative to the app root; site files keyed under the configured site dir
    pub source: PathBuf,
    /// Destination relative to the test root
    pub destination: PathBuf,
    /// Index of the rule that produced it
    pub rule: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub test_root: PathBuf,
    pub artifacts: Vec<StagedArtifact>,
}

impl StageReport {
    pub fn contains(&self, destination: impl AsRef<Path>) -> bool {
        let destination = destination.as_ref();
        self.artifacts.iter().any(|a| a.destination == destination)
    }
}

/// Ordered rule table plus the compiler used by `CompileScript`
pub struct Pipeline {
    rules: Vec<PipelineRule>,
    site_prefix: PathBuf,
    compiler: Arc<dyn ScriptCompiler>,
}

impl Pipeline {
    /// `site_prefix` is the path site files are keyed under when matched against `Site` rules
    pub fn new(
        rules: Vec<PipelineRule>,
        site_prefix: impl Into<PathBuf>,
        compiler: Arc<dyn ScriptCompiler>,
    ) -> Self {
        Self {
            rules,
            site_prefix: site_prefix.into(),
            compiler,
        }
    }

    /// The standard rule table:
    /// 1. `test/**/*.<source>` compiled to `<target>`
    /// 2. `test/**/*_test.<target>` copied
    /// 3. `test/support/**/*.<target>` copied
    /// 4. `<site>/**/*` copied to the test root top level
    pub fn standard(
        config: &PipelineConfig,
        site_dir: &str,
        compiler: Arc<dyn ScriptCompiler>,
    ) -> SuiteResult<Self> {
        let site_prefix = normalize_dir(site_dir)?;
        let source = Pattern::escape(&config.source_ext);
        let target = Pattern::escape(&config.target_ext);
        let site = site_prefix
            .iter()
            .map(|c| Pattern::escape(&c.to_string_lossy()))
            .collect::<Vec<_>>()
            .join("/");

        let rules = vec![
            PipelineRule::new(
                &format!("test/**/*.{}", source),
                Scope::App,
                Transform::CompileScript {
                    target_ext: config.target_ext.clone(),
                },
            )?,
            PipelineRule::new(
                &format!("test/**/*_test.{}", target),
                Scope::App,
                Transform::Copy,
            )?,
            PipelineRule::new(
                &format!("test/support/**/*.{}", target),
                Scope::App,
                Transform::Copy,
            )?,
            PipelineRule::new(
                &format!("{}/**/*", site),
                Scope::Site,
                Transform::CopyStripPrefix(site_prefix.clone()),
            )?,
        ];

        Ok(Self::new(rules, site_prefix, compiler))
    }

    pub fn rules(&self) -> &[PipelineRule] {
        &self.rules
    }

    /// Directories under the app root that `App` rules can match, outermost only.
    /// Staging walks these and nothing else, so `node_modules` and friends are never read.
    pub fn app_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .rules
            .iter()
            .filter(|rule| rule.scope == Scope::App)
            .map(|rule| literal_root(rule.pattern.as_str()))
            .collect();
        roots.sort();
        roots.dedup();

        let mut outermost: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !outermost.iter().any(|kept| root.starts_with(kept)) {
                outermost.push(root);
            }
        }
        outermost
    }

    /// Rebuild `test_root` from scratch. Any transform failure aborts the stage.
    pub fn stage(
        &self,
        app_root: &Path,
        site_path: &Path,
        test_root: &Path,
    ) -> SuiteResult<StageReport> {
        info!("Staging unit test root at {}", test_root.display());

        clean_dir(test_root)?;

        let mut sources: Vec<(Scope, PathBuf)> = Vec::new();
        for root in self.app_roots() {
            let start = app_root.join(&root);
            if !start.is_dir() {
                debug!("no {} under the app root, skipping", root.display());
                continue;
            }
            sources.extend(
                enumerate(app_root, &start, &[test_root, site_path])?
                    .into_iter()
                    .filter(|rel| category_of(rel) == TestCategory::Unit)
                    .map(|rel| (Scope::App, rel)),
            );
        }

        if !site_path.is_dir() {
            return Err(StagingError::new(site_path, "site output directory does not exist").into());
        }
        sources.extend(
            enumerate(site_path, site_path, &[])?
                .into_iter()
                .map(|rel| (Scope::Site, self.site_prefix.join(rel))),
        );

        let mut report = StageReport {
            test_root: test_root.to_path_buf(),
            artifacts: Vec::new(),
        };

        for (index, rule) in self.rules.iter().enumerate() {
            for (scope, rel) in &sources {
                if !rule.matches(*scope, rel) {
                    continue;
                }
                let origin = match scope {
                    Scope::App => app_root.join(rel),
                    Scope::Site => {
                        site_path.join(rel.strip_prefix(&self.site_prefix).unwrap_or(rel))
                    }
                };
                let destination = self.apply(&rule.transform, &origin, rel, test_root)?;
                debug!(
                    "rule {} staged {} -> {}",
                    index + 1,
                    rel.display(),
                    destination.display()
                );
                report.artifacts.push(StagedArtifact {
                    source: rel.clone(),
                    destination,
                    rule: index,
                });
            }
        }

        info!("Staged {} artifact(s)", report.artifacts.len());
        Ok(report)
    }

    /// Run one transform, returning the destination relative to the test root
    fn apply(
        &self,
        transform: &Transform,
        origin: &Path,
        rel: &Path,
        test_root: &Path,
    ) -> SuiteResult<PathBuf> {
        let destination = match transform {
            Transform::CompileScript { target_ext } => rel.with_extension(target_ext),
            Transform::Copy => rel.to_path_buf(),
            Transform::CopyStripPrefix(prefix) => rel
                .strip_prefix(prefix)
                .map(Path::to_path_buf)
                .map_err(|_| StagingError::new(rel, format!("not under {}", prefix.display())))?,
        };

        let target = test_root.join(&destination);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StagingError::new(parent, e))?;
        }

        match transform {
            Transform::CompileScript { .. } => {
                let compiled = self
                    .compiler
                    .compile(origin)
                    .map_err(|e| StagingError::new(rel, e))?;
                std::fs::write(&target, compiled).map_err(|e| StagingError::new(&target, e))?;
            }
            Transform::Copy | Transform::CopyStripPrefix(_) => {
                std::fs::copy(origin, &target).map_err(|e| StagingError::new(rel, e))?;
            }
        }

        Ok(destination)
    }
}

/// Remove whatever a previous run left behind and recreate the directory
fn clean_dir(dir: &Path) -> SuiteResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| StagingError::new(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| StagingError::new(dir, e))?;
    Ok(())
}

/// `site_dir` as plain components, so `site/`, `./site` and `build/site` all key consistently
fn normalize_dir(site_dir: &str) -> SuiteResult<PathBuf> {
    let normalized: PathBuf = Path::new(site_dir)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        return Err(SuiteError::Config(format!(
            "site_dir {:?} does not name a directory",
            site_dir
        )));
    }
    Ok(normalized)
}

/// Leading directories of a pattern that contain no glob syntax
fn literal_root(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    dirs.iter()
        .take_while(|seg| !seg.contains(['*', '?', '[', ']']))
        .collect()
}

/// Files under `start`, relative to `base`, sorted, skipping the `exclude` subtrees
fn enumerate(base: &Path, start: &Path, exclude: &[&Path]) -> SuiteResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(start)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !exclude.iter().any(|skip| e.path() == *skip));

    for entry in walker {
        let entry = entry.map_err(|e| StagingError::new(start, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(base) {
            files.push(rel.to_path_buf());
        }
    }
    Ok(files)
}
