//! Configuration and path errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to locate, read, parse, or validate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid JSON5 in config: {0}")]
    Syntax(String),

    /// One or more settings are out of range. Multiple problems are joined
    /// with `"; "`.
    #[error("Invalid config: {0}")]
    Validation(String),

    #[error("Could not serialize config: {0}")]
    Serialize(String),

    #[error("Could not determine home directory; set GPTVAULT_HOME")]
    NoHomeDir,

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
}
