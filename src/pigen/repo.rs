// file: src/pigen/repo.rs
// version: 1.0.0
// guid: f0a7c3e1-4d2b-49c8-b5e6-13d8a9f2c740

//! Checkout of the pinned pi-gen revision

use super::PiGenWorkspace;
use crate::config::PiGenSource;
use crate::error::ConfiguratorError;
use crate::Result;
use std::path::Path;
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Clones pi-gen and pins it to a revision
pub struct PiGenRepository {
    source: PiGenSource,
}

impl PiGenRepository {
    pub fn new(source: PiGenSource) -> Self {
        Self { source }
    }

    /// Fresh checkout at `dest`; anything already there is removed first
    pub async fn checkout<P: AsRef<Path>>(&self, dest: P) -> Result<PiGenWorkspace> {
        let dest = dest.as_ref();

        if fs::try_exists(dest).await? {
            debug!("Removing previous checkout: {}", dest.display());
            fs::remove_dir_all(dest).await?;
        }

        info!("Cloning {} to {}", self.source.repository, dest.display());
        let dest_arg = dest.to_string_lossy();
        run_git(&["clone", &self.source.repository, &dest_arg]).await?;

        info!("Checking out {}", self.source.revision);
        run_git(&["-C", &dest_arg, "reset", "--hard", &self.source.revision]).await?;

        Ok(PiGenWorkspace::new(dest))
    }
}

async fn run_git(args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ConfiguratorError::system(format!("Failed to run git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConfiguratorError::system(format!(
            "git {} failed with exit code {}: {}",
            args.first().copied().unwrap_or_default(),
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
