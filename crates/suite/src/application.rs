//! The application under test: where it lives and how it builds itself

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{SuiteError, SuiteResult};

#[async_trait]
pub trait Application: Send + Sync {
    /// Application root; test file paths are relative to it
    fn root(&self) -> &Path;

    /// Compiled site output
    fn site_path(&self) -> &Path;

    /// Build the application. Fails with `SuiteError::Compile`.
    async fn compile(&self) -> SuiteResult<()>;
}

/// An application built by running a command in its root
#[derive(Debug, Clone)]
pub struct CommandApplication {
    root: PathBuf,
    site_path: PathBuf,
    build_command: Vec<String>,
}

impl CommandApplication {
    pub fn new(root: impl Into<PathBuf>, config: &AppConfig) -> Self {
        let root = root.into();
        Self {
            site_path: root.join(&config.site_dir),
            root,
            build_command: config.build_command.clone(),
        }
    }
}

#[async_trait]
impl Application for CommandApplication {
    fn root(&self) -> &Path {
        &self.root
    }

    fn site_path(&self) -> &Path {
        &self.site_path
    }

    async fn compile(&self) -> SuiteResult<()> {
        let Some((program, args)) = self.build_command.split_first() else {
            debug!("No build command configured, skipping compile");
            return Ok(());
        };

        info!("Compiling application: {}", self.build_command.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SuiteError::Compile(format!("failed to spawn {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(SuiteError::Compile(format!(
                "{} exited with {}\nstdout: {}\nstderr: {}",
                program, output.status, stdout, stderr
            )));
        }

        Ok(())
    }
}
