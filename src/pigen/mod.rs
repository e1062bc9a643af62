// file: src/pigen/mod.rs
// version: 1.0.0
// guid: 61e3b8d2-0f7a-4c95-b2d8-4a9c1e7f3b06

//! Boundary to the external pi-gen image builder
//!
//! pi-gen is cloned unmodified and driven through the files it reads: its
//! `config` file, per-stage `NN-run.sh` scripts and debconf seeds, and
//! `SKIP`/`SKIP_IMAGES` markers.

pub mod dispatcher;
pub mod render;
pub mod repo;
pub mod tunnel;

pub use dispatcher::BuildDispatcher;
pub use render::{RenderedFile, ShellConfig};
pub use repo::PiGenRepository;
pub use tunnel::TunnelInstaller;

use std::path::{Path, PathBuf};

/// Default checkout directory, relative to the invocation directory
pub const WORK_DIR_NAME: &str = "pi-gen";

/// Name of the docker container pi-gen leaves behind
pub const CONTAINER_NAME: &str = "pigen_work";

/// Paths inside a pi-gen checkout
pub mod paths {
    pub const CONFIG: &str = "config";
    pub const USER_RUN: &str = "stage2/03-username-password/00-run.sh";
    pub const WPA_SUPPLICANT: &str = "stage2/02-net-tweaks/files/wpa_supplicant.conf";
    pub const WIFI_RUN: &str = "stage2/02-net-tweaks/02-run.sh";
    pub const SSH_RUN: &str = "export-image/03-finalise/00-run.sh";
    pub const TUNNEL_DIR: &str = "stage2/04-custom-installations";
    pub const TUNNEL_FILES_DIR: &str = "stage2/04-custom-installations/files";
    pub const TUNNEL_RUN: &str = "stage2/04-custom-installations/00-run.sh";
    pub const TUNNEL_CONFIG: &str = "stage2/04-custom-installations/files/ssh_config.yml";
    pub const TUNNEL_CRON: &str = "stage2/04-custom-installations/files/start_tunnel";
    pub const LOCALE_DEBCONF: &str = "stage0/01-locale/00-debconf";
    pub const TIMEZONE_RUN: &str = "stage2/05-timezone/00-run.sh";
    pub const KEYBOARD_DEBCONF: &str = "stage2/01-sys-tweaks/00-debconf";
    pub const DEPLOY: &str = "deploy";

    /// Stages that are not built at all
    pub const SKIP_MARKERS: &[&str] = &["stage3/SKIP", "stage4/SKIP", "stage5/SKIP"];

    /// Stages that produce no image of their own
    pub const SKIP_IMAGE_MARKERS: &[&str] = &["stage4/SKIP_IMAGES", "stage5/SKIP_IMAGES"];
}

/// A pi-gen checkout on disk
#[derive(Debug, Clone)]
pub struct PiGenWorkspace {
    root: PathBuf,
}

impl PiGenWorkspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Checkout root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a file inside the checkout
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Directory pi-gen writes finished images into
    pub fn deploy_dir(&self) -> PathBuf {
        self.path(paths::DEPLOY)
    }
}
