// file: src/pigen/dispatcher.rs
// version: 1.1.0
// guid: 2b8e5f13-7c4a-4d90-a6e2-9f1d3c8b7a54

//! Writes the rendered configuration and runs the pi-gen build script

use super::render::{render_layout, RenderedFile, Templates};
use super::{paths, PiGenWorkspace};
use crate::config::BuildConfiguration;
use crate::error::ConfiguratorError;
use crate::logging::{BuildLog, BUILD_OUTPUT_TARGET};
use crate::Result;
use std::process::Stdio;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Drives a single pi-gen build inside a checkout
pub struct BuildDispatcher {
    workspace: PiGenWorkspace,
    build_script: String,
    log: BuildLog,
}

impl BuildDispatcher {
    pub fn new(workspace: PiGenWorkspace, build_script: impl Into<String>, log: BuildLog) -> Self {
        Self {
            workspace,
            build_script: build_script.into(),
            log,
        }
    }

    pub fn workspace(&self) -> &PiGenWorkspace {
        &self.workspace
    }

    /// Write the configuration, then run the build to completion
    pub async fn dispatch(&self, config: &BuildConfiguration) -> Result<()> {
        self.write_configuration(config).await?;
        self.run_build().await
    }

    /// Load the pi-gen files that are patched in place
    pub async fn read_templates(&self) -> Result<Templates> {
        Ok(Templates {
            wpa_supplicant: self.read_checkout_file(paths::WPA_SUPPLICANT).await?,
            locale_debconf: self.read_checkout_file(paths::LOCALE_DEBCONF).await?,
            keyboard_debconf: self.read_checkout_file(paths::KEYBOARD_DEBCONF).await?,
        })
    }

    /// Render and write every configuration file into the checkout
    pub async fn write_configuration(&self, config: &BuildConfiguration) -> Result<Vec<RenderedFile>> {
        let templates = self.read_templates().await?;
        let files = render_layout(config, &templates)?;

        for file in &files {
            self.write_file(file).await?;
        }

        info!("Wrote {} files into {}", files.len(), self.workspace.root().display());
        Ok(files)
    }

    /// Run the build script, relaying its output into the build log
    pub async fn run_build(&self) -> Result<()> {
        let script = self.workspace.path(&self.build_script);
        info!("Running {}", script.display());

        let mut child = Command::new(&script)
            .current_dir(self.workspace.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConfiguratorError::system(format!("Failed to start {}: {}", script.display(), e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConfiguratorError::system("build stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConfiguratorError::system("build stderr not captured"))?;

        let (stdout_result, stderr_result) =
            tokio::join!(self.relay(stdout, false), self.relay(stderr, true));
        let status = child.wait().await?;
        stdout_result?;
        let stderr_lines = stderr_result?;

        if !status.success() {
            return Err(ConfiguratorError::ExternalToolFailure {
                code: status.code().unwrap_or(-1),
                stderr: stderr_lines.join(", "),
            });
        }

        info!("Build finished");
        Ok(())
    }

    /// Copy each line into the build log until the stream closes.
    ///
    /// Child output is not guaranteed to be UTF-8; invalid bytes are replaced
    /// rather than ending the relay. Lines are returned only when `collect`.
    async fn relay<R: AsyncRead + Unpin>(&self, stream: R, collect: bool) -> Result<Vec<String>> {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        let mut seen = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);
            self.log.append_line(line)?;
            debug!(target: BUILD_OUTPUT_TARGET, "{}", line);
            if collect {
                seen.push(line.to_string());
            }
        }
        Ok(seen)
    }

    async fn read_checkout_file(&self, relative: &str) -> Result<String> {
        let path = self.workspace.path(relative);
        fs::read_to_string(&path).await.map_err(|e| {
            ConfiguratorError::system(format!("Cannot read {}: {}", path.display(), e))
        })
    }

    async fn write_file(&self, file: &RenderedFile) -> Result<()> {
        let path = self.workspace.path(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &file.contents).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path).await?.permissions();
            perms.set_mode(file.mode);
            fs::set_permissions(&path, perms).await?;
        }

        debug!("Wrote {} ({:o})", file.path, file.mode);
        Ok(())
    }
}
