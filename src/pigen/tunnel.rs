// file: src/pigen/tunnel.rs
// version: 1.0.0
// guid: 4d9b2f70-e8c1-4a63-8f05-c7a1e3b95d28

//! ngrok binary for the optional SSH tunnel

use super::{paths, PiGenWorkspace};
use crate::error::ConfiguratorError;
use crate::network::NetworkDownloader;
use crate::Result;
use std::path::Path;
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::info;

/// File the release archive must contain, and nothing else
pub const TUNNEL_BINARY: &str = "ngrok";

/// Downloads and unpacks the ngrok release into the checkout
pub struct TunnelInstaller {
    downloader: NetworkDownloader,
    url: String,
}

impl TunnelInstaller {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            downloader: NetworkDownloader::new(),
            url: url.into(),
        }
    }

    /// Place the ngrok binary in the custom-installations files directory
    pub async fn install(&self, workspace: &PiGenWorkspace) -> Result<()> {
        let files_dir = workspace.path(paths::TUNNEL_FILES_DIR);
        if fs::try_exists(&files_dir).await? {
            fs::remove_dir_all(&files_dir).await?;
        }
        fs::create_dir_all(&files_dir).await?;

        let archive = tempfile::Builder::new()
            .prefix("ngrok-")
            .suffix(".zip")
            .tempfile()?;
        self.downloader
            .download_with_progress(&self.url, archive.path())
            .await?;

        unpack(archive.path(), &files_dir).await?;
        verify_unpacked(&files_dir).await?;

        info!("Installed {} into {}", TUNNEL_BINARY, files_dir.display());
        Ok(())
    }
}

async fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let output = Command::new("unzip")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(dest)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ConfiguratorError::system(format!("Failed to run unzip: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConfiguratorError::system(format!(
            "unzip failed with exit code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }
    Ok(())
}

/// The archive must have produced exactly the ngrok binary
async fn verify_unpacked(dir: &Path) -> Result<()> {
    let mut entries = fs::read_dir(dir).await?;
    let mut found = false;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name != TUNNEL_BINARY {
            return Err(ConfiguratorError::system(format!(
                "should be {} file in archive, but was {}",
                TUNNEL_BINARY,
                name.to_string_lossy()
            )));
        }
        found = true;
    }

    if !found {
        return Err(ConfiguratorError::system(format!(
            "archive did not contain {}",
            TUNNEL_BINARY
        )));
    }
    Ok(())
}
