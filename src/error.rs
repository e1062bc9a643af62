// file: src/error.rs
// version: 3.0.0
// guid: 0f4c6b1e-2a7d-4e59-9c83-5b1d7e2a9f40

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, ConfiguratorError>;

/// Error types for the pi-gen configurator
#[derive(Error, Debug)]
pub enum ConfiguratorError {
    #[error("Missing required value: {0}")]
    MissingRequiredValue(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Image build failed with exit code {code}: {stderr}")]
    ExternalToolFailure { code: i32, stderr: String },

    #[error("Artifacts missing: {0}")]
    ArtifactsMissing(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("System error: {0}")]
    SystemError(String),

    #[error("Interrupted by operator")]
    Interrupted,
}

impl ConfiguratorError {
    /// Create a new missing value error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredValue(field.into())
    }

    /// Create a new invalid value error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Create a new system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::SystemError(msg.into())
    }

    /// Process exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingRequiredValue(_) | Self::InvalidValue(_) => 2,
            Self::ExternalToolFailure { .. } => 3,
            Self::ArtifactsMissing(_) => 4,
            Self::Interrupted => 130,
            _ => 1,
        }
    }
}

impl From<fs_extra::error::Error> for ConfiguratorError {
    fn from(err: fs_extra::error::Error) -> Self {
        Self::IoError(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}
