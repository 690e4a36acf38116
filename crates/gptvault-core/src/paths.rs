//! Path resolution utilities.

use crate::env::{self, vars};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the GPTVault base directory (`$GPTVAULT_HOME` or `~/.gptvault`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = env::get_var(vars::GPTVAULT_HOME) {
        return Ok(expand_tilde(&home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".gptvault"))
}

/// Get the main config file path (`~/.gptvault/gptvault.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("gptvault.json5"))
}

/// Get the default vault storage directory (`~/.gptvault/vault`).
pub fn vault_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("vault"))
}

/// Ensure the base directory exists, owner-only on Unix.
pub fn ensure_base_dir() -> Result<PathBuf, ConfigError> {
    let dir = base_dir()?;
    std::fs::create_dir_all(&dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(dir)
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_under_base_dir() {
        let base = base_dir().unwrap();
        let config = config_file().unwrap();
        assert!(config.starts_with(&base));
        assert!(config.ends_with("gptvault.json5"));
    }

    #[test]
    fn test_vault_dir_under_base_dir() {
        let vault = vault_dir().unwrap();
        assert!(vault.ends_with("vault"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/test");
        assert!(!expanded.to_string_lossy().contains('~'));

        let untouched = expand_tilde("/abs/path");
        assert_eq!(untouched, PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_resolve_relative() {
        let base = Path::new("/base");
        assert_eq!(
            resolve_relative(base, Path::new("vault")),
            PathBuf::from("/base/vault")
        );
        assert_eq!(
            resolve_relative(base, Path::new("/other")),
            PathBuf::from("/other")
        );
    }
}
