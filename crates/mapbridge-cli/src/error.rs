//! Error handling for the bridge CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] mapbridge_core::CoordinatorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid device address: {0}")]
    InvalidDevice(String),

    #[error("Simulation failed: {0}")]
    Simulation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML encoding error: {0}")]
    TomlEncoding(#[from] toml::ser::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        CliError::Config(err.to_string())
    }
}
