// file: src/lib.rs
// version: 3.0.0
// guid: d82472d1-7f0f-4eb4-b0a3-6e1547103eb4

//! # pi-gen configurator
//!
//! Collects the settings for a headless Raspberry Pi OS image from flags, an
//! optional YAML file or interactive prompts, writes them into a pinned pi-gen
//! checkout and runs its docker build.
//!
//! Output lands in `./artifacts`, the full build transcript in `./build.log`.

pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod network;
pub mod pigen;
pub mod prompt;
pub mod utils;

pub use error::{ConfiguratorError, Result};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
