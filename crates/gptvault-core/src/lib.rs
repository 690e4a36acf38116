//! # gptvault-core
//!
//! Shared functionality used across the GPTVault crates:
//!
//! - **Configuration**: loading, validation, and persistence of `gptvault.json5`
//! - **Secrets**: [`SecretString`], a zeroizing, redacting string wrapper
//! - **Utilities**: base directory resolution and environment handling

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;

pub use config::{Config, KdfConfig, LogLevel, LoggingConfig, SessionConfig, StorageConfig};
pub use error::ConfigError;
pub use secret::SecretString;
