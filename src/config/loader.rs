// file: src/config/loader.rs
// version: 2.0.0
// guid: d4e5f6a7-b8c9-4012-8456-7890123defab

//! Configuration file loading and environment variable substitution

use super::{ConfigurationInput, PiGenSource, DEFAULT_TUNNEL_DOWNLOAD_URL};
use crate::error::ConfiguratorError;
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Optional YAML file supplying defaults for a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Settings used when not given on the command line
    #[serde(flatten)]
    pub settings: ConfigurationInput,
    /// pi-gen checkout settings
    pub pi_gen: PiGenSource,
    /// ngrok archive location
    pub tunnel_download_url: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            settings: ConfigurationInput::default(),
            pi_gen: PiGenSource::default(),
            tunnel_download_url: DEFAULT_TUNNEL_DOWNLOAD_URL.to_string(),
        }
    }
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Load the defaults file; no path means built-in defaults
    pub fn load<P: AsRef<Path>>(&self, path: Option<P>) -> Result<ConfigFile> {
        match path {
            Some(path) => self.load_config_file(path),
            None => Ok(ConfigFile::default()),
        }
    }

    /// Load configuration from a YAML file
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<ConfigFile> {
        let content = fs::read_to_string(&path).map_err(|e| {
            ConfiguratorError::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let expanded = self.expand_env_vars(&content)?;
        if expanded.trim().is_empty() {
            return Ok(ConfigFile::default());
        }

        let config: ConfigFile = serde_yaml::from_str(&expanded)?;
        Self::check_source(&config.pi_gen)?;
        Ok(config)
    }

    /// Expand environment variables in configuration content
    fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfiguratorError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut result = content.to_string();
        let mut missing_vars = Vec::new();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];

            if let Some(value) = self.env_vars.get(var_name) {
                result = result.replace(placeholder, value);
            } else if !missing_vars.iter().any(|v| v == var_name) {
                missing_vars.push(var_name.to_string());
            }
        }

        if !missing_vars.is_empty() {
            return Err(ConfiguratorError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result)
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    fn check_source(source: &PiGenSource) -> Result<()> {
        if source.repository.trim().is_empty() {
            return Err(ConfiguratorError::config("pi_gen.repository cannot be empty"));
        }
        if source.revision.trim().is_empty() {
            return Err(ConfiguratorError::config("pi_gen.revision cannot be empty"));
        }
        if source.build_script.is_empty() || source.build_script.contains('/') {
            return Err(ConfiguratorError::config(format!(
                "pi_gen.build_script must be a file name inside the checkout: {}",
                source.build_script
            )));
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
