// file: src/utils/system.rs
// version: 2.0.0
// guid: w3x4y5z6-a7b8-9012-3456-789012wxyzab

//! Host checks and docker housekeeping

use crate::error::ConfiguratorError;
use crate::Result;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Check if running as root
    pub fn is_root() -> bool {
        #[cfg(unix)]
        {
            unsafe { libc::getuid() == 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Commands the run needs that are missing from PATH
    pub fn check_prerequisites(tunnel: bool) -> Vec<String> {
        let mut required = vec!["git", "docker"];
        if tunnel {
            required.push("unzip");
        }

        required
            .into_iter()
            .filter(|cmd| !Self::command_exists(cmd))
            .map(str::to_string)
            .collect()
    }

    /// Remove a container left behind by an earlier build, if there is one
    pub async fn remove_stale_container(name: &str) -> Result<bool> {
        let filter = format!("name={}", name);
        let existing = Self::run("docker", &["ps", "-a", "-q", "-f", &filter]).await?;
        if existing.trim().is_empty() {
            debug!("No {} container to remove", name);
            return Ok(false);
        }

        info!("Removing stale container {}", name);
        Self::run("docker", &["rm", "-v", name]).await?;
        Ok(true)
    }

    /// Remove a directory tree if present
    pub async fn remove_dir_if_exists(path: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(false);
        }
        debug!("Removing {}", path.display());
        tokio::fs::remove_dir_all(path).await?;
        Ok(true)
    }

    async fn run(command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ConfiguratorError::system(format!("Failed to run {}: {}", command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConfiguratorError::system(format!(
                "{} {} failed with exit code {}: {}",
                command,
                args.join(" "),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
