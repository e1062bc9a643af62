// file: src/image/relocator.rs
// version: 1.0.0
// guid: 8a3f1c6d-52e9-4b07-9d1e-c4b6a2f7e913

//! Moves finished images out of the pi-gen checkout

use crate::error::ConfiguratorError;
use crate::Result;
use fs_extra::dir::CopyOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Default destination, relative to the invocation directory
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Copies the contents of pi-gen's `deploy/` into the artifacts directory
pub struct ArtifactRelocator {
    source: PathBuf,
    destination: PathBuf,
}

impl ArtifactRelocator {
    pub fn new<S: AsRef<Path>, D: AsRef<Path>>(source: S, destination: D) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            destination: destination.as_ref().to_path_buf(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Drop artifacts from an earlier run
    pub fn clear_previous(&self) -> Result<()> {
        if self.destination.exists() {
            debug!("Removing previous {}", self.destination.display());
            std::fs::remove_dir_all(&self.destination)?;
        }
        Ok(())
    }

    /// Copy every deploy file; returns the copied paths relative to the destination
    pub fn relocate(&self) -> Result<Vec<PathBuf>> {
        let files = list_files(&self.source)?;
        if files.is_empty() {
            return Err(ConfiguratorError::ArtifactsMissing(format!(
                "no files in {}",
                self.source.display()
            )));
        }

        std::fs::create_dir_all(&self.destination)?;
        let mut options = CopyOptions::new();
        options.content_only = true;
        options.overwrite = true;
        fs_extra::dir::copy(&self.source, &self.destination, &options)?;

        for file in &files {
            info!("Artifact: {}", self.destination.join(file).display());
        }
        Ok(files)
    }
}

fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ConfiguratorError::ArtifactsMissing(format!(
            "{} does not exist",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| ConfiguratorError::system(format!("walkdir error: {}", e)))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ConfiguratorError::system(format!("strip_prefix failed: {}", e)))?;
        files.push(rel.to_path_buf());
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relocate_copies_deploy_contents() {
        let temp_dir = TempDir::new().unwrap();
        let deploy = temp_dir.path().join("pi-gen/deploy");
        std::fs::create_dir_all(deploy.join("logs")).unwrap();
        std::fs::write(deploy.join("image_raspberry-lite.zip"), b"img").unwrap();
        std::fs::write(deploy.join("logs/build.log"), b"log").unwrap();
        let artifacts = temp_dir.path().join(ARTIFACTS_DIR);

        let copied = ArtifactRelocator::new(&deploy, &artifacts).relocate().unwrap();

        assert_eq!(
            copied,
            vec![
                PathBuf::from("image_raspberry-lite.zip"),
                PathBuf::from("logs/build.log")
            ]
        );
        assert_eq!(std::fs::read(artifacts.join("image_raspberry-lite.zip")).unwrap(), b"img");
        assert!(artifacts.join("logs/build.log").exists());
        assert!(!artifacts.join("deploy").exists());
    }

    #[test]
    fn test_missing_deploy_dir_is_artifacts_missing() {
        let temp_dir = TempDir::new().unwrap();
        let relocator = ArtifactRelocator::new(
            temp_dir.path().join("pi-gen/deploy"),
            temp_dir.path().join(ARTIFACTS_DIR),
        );

        let err = relocator.relocate().unwrap_err();

        assert!(matches!(err, ConfiguratorError::ArtifactsMissing(_)));
        assert_eq!(err.exit_code(), 4);
        assert!(!temp_dir.path().join(ARTIFACTS_DIR).exists());
    }

    #[test]
    fn test_empty_deploy_dir_is_artifacts_missing() {
        let temp_dir = TempDir::new().unwrap();
        let deploy = temp_dir.path().join("deploy");
        std::fs::create_dir_all(deploy.join("empty-subdir")).unwrap();

        let err = ArtifactRelocator::new(&deploy, temp_dir.path().join(ARTIFACTS_DIR))
            .relocate()
            .unwrap_err();

        assert!(matches!(err, ConfiguratorError::ArtifactsMissing(_)));
    }

    #[test]
    fn test_clear_previous_removes_old_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let artifacts = temp_dir.path().join(ARTIFACTS_DIR);
        std::fs::create_dir_all(&artifacts).unwrap();
        std::fs::write(artifacts.join("old.zip"), b"old").unwrap();

        let relocator = ArtifactRelocator::new(temp_dir.path().join("deploy"), &artifacts);
        relocator.clear_previous().unwrap();
        relocator.clear_previous().unwrap();

        assert!(!artifacts.exists());
    }
}
