//! Error types for envact-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] envact_config::ConfigError),

    #[error("Host error: {0}")]
    Host(#[from] envact_host::HostError),

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
