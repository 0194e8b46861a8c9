//! Common error types for audiobuf

use thiserror::Error;

/// Common result type for audiobuf configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or setting up logging
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (unknown preset names, bad values)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
