//! Error types for suite orchestration

use std::path::PathBuf;

use thiserror::Error;

/// A pipeline transform failed while building the test root.
#[derive(Error, Debug)]
#[error("failed to stage {path}: {reason}")]
pub struct StagingError {
    /// Source file the failing transform was applied to
    pub path: PathBuf,
    pub reason: String,
}

impl StagingError {
    pub fn new(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Application failed to compile: {0}")]
    Compile(String),

    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("Script compiler error: {0}")]
    Compiler(String),

    #[error("Runner failed for {file}: {reason}")]
    Runner { file: String, reason: String },

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Headless browser not found. Install with: npx playwright install chromium")]
    BrowserNotFound,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Harness error: {0}")]
    Harness(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SuiteError {
    /// Setup failures abort the whole suite; everything else is recorded per file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SuiteError::Compile(_) | SuiteError::Staging(_))
    }
}

pub type SuiteResult<T> = Result<T, SuiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_are_fatal() {
        assert!(SuiteError::Compile("boom".into()).is_fatal());
        assert!(SuiteError::Staging(StagingError::new("test/a.coffee", "bad token")).is_fatal());
        assert!(!SuiteError::Browser("crashed".into()).is_fatal());
        assert!(!SuiteError::ServerHealthCheck(3).is_fatal());
    }

    #[test]
    fn test_staging_error_names_file() {
        let err = SuiteError::from(StagingError::new("test/unit/a_test.coffee", "unexpected ->"));
        assert_eq!(
            err.to_string(),
            "Staging failed: failed to stage test/unit/a_test.coffee: unexpected ->"
        );
    }
}
