//! Live application server for integration tests

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{SuiteError, SuiteResult};

/// Handle to a running server process; stopped on drop
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Start the server in `app_root` and wait until it answers health checks
    pub async fn spawn(config: &ServerConfig, app_root: &Path) -> SuiteResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| SuiteError::Config("server.command must not be empty".to_string()))?;

        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://{}:{}", config.host, port);

        info!("Spawning application server on port {}", port);

        let child = Command::new(program)
            .args(args)
            .current_dir(app_root)
            .envs(&config.env)
            .env("PORT", port.to_string())
            .env("HOST", &config.host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| SuiteError::ServerStartup(format!("Failed to spawn {}: {}", program, e)))?;

        let mut handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        // Wait for server to be healthy
        if let Err(e) = handle.wait_for_healthy(config).await {
            handle.stop()?;
            return Err(e);
        }

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    async fn wait_for_healthy(&mut self, config: &ServerConfig) -> SuiteResult<()> {
        let health_url = format!("{}{}", self.base_url, config.health_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let timeout_duration = Duration::from_secs(config.startup_timeout_secs);
        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            if let Some(status) = self.child.try_wait()? {
                return Err(SuiteError::ServerStartup(format!(
                    "server exited early with {}",
                    status
                )));
            }

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // refused connections are expected while booting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(SuiteError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server: SIGTERM first, then kill
    pub fn stop(&mut self) -> SuiteResult<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        info!("Stopping server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// How to start the application server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server argv, run in the application root
    pub command: Vec<String>,

    pub host: String,

    /// Port to listen on (None = find a free port)
    pub port: Option<u16>,

    /// Path polled until it answers 2xx
    pub health_path: String,

    pub startup_timeout_secs: u64,

    pub env: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec!["npm".to_string(), "start".to_string()],
            host: "127.0.0.1".to_string(),
            port: Some(4567),
            health_path: "/".to_string(),
            startup_timeout_secs: 30,
            env: BTreeMap::new(),
        }
    }
}

/// Find a free port to use
fn find_free_port() -> SuiteResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
