//! Error types for host collaborators

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to create terminal: {0}")]
    TerminalCreation(String),

    #[error("Terminal {0} is no longer available")]
    TerminalGone(u64),

    #[error("Command execution failed: {0}")]
    ExecError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid environment descriptor: {0}")]
    InvalidEnvironment(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, HostError>;
