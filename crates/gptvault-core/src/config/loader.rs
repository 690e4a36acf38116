//! Configuration loading and persistence.

use super::{Config, KdfConfig, LogLevel, SessionConfig};
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

impl Config {
    /// Config path: `$GPTVAULT_CONFIG` or `~/.gptvault/gptvault.json5`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        match env::get_var(vars::GPTVAULT_CONFIG) {
            Some(path) => Ok(paths::expand_tilde(&path)),
            None => paths::config_file(),
        }
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Syntax(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    ///
    /// Parse and validation failures are still returned.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }

    /// Write the config to `path` through a sibling temp file and rename.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staged = path.with_extension("json5.partial");
        fs::write(&staged, content)?;
        fs::rename(&staged, path)?;
        debug!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; JSON is valid JSON5.
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.session.problems());
        errors.extend(self.kdf.problems());

        if let Some(dir) = &self.storage.dir {
            if dir.as_os_str().is_empty() {
                errors.push("Storage dir must not be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            warn!(count = errors.len(), "configuration failed validation");
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Resolve the vault directory.
    ///
    /// Priority: `$GPTVAULT_VAULT_DIR`, then `storage.dir`, then the default
    /// under the base directory. Relative paths resolve against the base.
    pub fn vault_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = env::get_var(vars::GPTVAULT_VAULT_DIR) {
            return Ok(paths::expand_tilde(&dir));
        }
        match &self.storage.dir {
            Some(dir) => {
                let expanded = paths::expand_tilde(&dir.to_string_lossy());
                Ok(paths::resolve_relative(&paths::base_dir()?, &expanded))
            }
            None => paths::vault_dir(),
        }
    }
}

/// Assembles a [`Config`] in code.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session inactivity bounds.
    pub fn session(mut self, timeout_minutes: u32, warning_minutes: u32) -> Self {
        self.config.session = SessionConfig {
            timeout_minutes,
            warning_minutes,
        };
        self
    }

    /// Set the KDF cost.
    pub fn kdf(mut self, kdf: KdfConfig) -> Self {
        self.config.kdf = kdf;
        self
    }

    /// Set the vault directory.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage.dir = Some(dir.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json5_with_comments() {
        let config = Config::parse(
            r#"{
                // lock quickly on shared machines
                session: { timeout_minutes: 10, warning_minutes: 2 },
                logging: { level: "debug" },
            }"#,
        )
        .unwrap();
        assert_eq!(config.session.timeout_minutes, 10);
        assert_eq!(config.session.warning_minutes, 2);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.kdf, KdfConfig::default());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Config::parse("not valid json"),
            Err(ConfigError::Syntax(_))
        ));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = ConfigBuilder::new().session(0, 0).build();
        config.kdf.iterations = 0;

        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("timeout_minutes"));
        assert!(msg.contains("iterations"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("gptvault.json5");

        let config = ConfigBuilder::new()
            .session(45, 10)
            .storage_dir("/tmp/vault")
            .log_level(LogLevel::Warn)
            .build();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json5");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.json5")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gptvault.json5");
        fs::write(&path, "{ session: { timeout_minutes: 5, warning_minutes: 9 } }").unwrap();

        assert!(matches!(
            Config::load_or_default(&path),
            Err(ConfigError::Validation(_))
        ));
    }
}
