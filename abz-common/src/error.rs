//! Common error types for abz

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for abz operations
pub type Result<T> = std::result::Result<T, Error>;

/// Startup-time errors shared by the abz crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Invalid config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
}
