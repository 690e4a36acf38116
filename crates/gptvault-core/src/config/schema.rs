//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main GPTVault configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Inactivity auto-lock settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Passphrase key-derivation cost.
    #[serde(default)]
    pub kdf: KdfConfig,

    /// Where the encrypted store lives.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inactivity behaviour of an unlocked session.
///
/// After `timeout_minutes - warning_minutes` of inactivity the session enters
/// the warning state; after `timeout_minutes` it locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Minutes of inactivity before the session locks.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u32,

    /// Minutes before the lock at which the warning starts.
    #[serde(default = "default_warning_minutes")]
    pub warning_minutes: u32,
}

fn default_timeout_minutes() -> u32 {
    30
}

fn default_warning_minutes() -> u32 {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            warning_minutes: default_warning_minutes(),
        }
    }
}

impl SessionConfig {
    /// Collect validation problems for this section.
    pub fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.timeout_minutes == 0 {
            errors.push("Session timeout_minutes must be at least 1".to_string());
        }
        if self.warning_minutes >= self.timeout_minutes {
            errors.push(format!(
                "Session warning_minutes ({}) must be less than timeout_minutes ({})",
                self.warning_minutes, self.timeout_minutes
            ));
        }
        errors
    }
}

/// Argon2id cost parameters for deriving the master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfConfig {
    /// Time cost (number of passes).
    #[serde(default = "default_kdf_iterations")]
    pub iterations: u32,

    /// Memory cost in KiB.
    #[serde(default = "default_kdf_memory_kib")]
    pub memory_kib: u32,

    /// Degree of parallelism.
    #[serde(default = "default_kdf_parallelism")]
    pub parallelism: u32,
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_memory_kib() -> u32 {
    64 * 1024
}

fn default_kdf_parallelism() -> u32 {
    1
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: default_kdf_iterations(),
            memory_kib: default_kdf_memory_kib(),
            parallelism: default_kdf_parallelism(),
        }
    }
}

impl KdfConfig {
    /// Collect validation problems for this section.
    pub fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.iterations == 0 {
            errors.push("KDF iterations must be at least 1".to_string());
        }
        if self.parallelism == 0 {
            errors.push("KDF parallelism must be at least 1".to_string());
        }
        if self.memory_kib < 8 * self.parallelism.max(1) {
            errors.push(format!(
                "KDF memory_kib ({}) must be at least 8 * parallelism",
                self.memory_kib
            ));
        }
        errors
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Vault directory. Defaults to `~/.gptvault/vault`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
