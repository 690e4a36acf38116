//! Environment variable handling.

use std::env;

/// Environment variable names recognised by GPTVault.
pub mod vars {
    /// Overrides the base directory (default `~/.gptvault`).
    pub const GPTVAULT_HOME: &str = "GPTVAULT_HOME";
    /// Overrides the config file path.
    pub const GPTVAULT_CONFIG: &str = "GPTVAULT_CONFIG";
    /// Overrides the vault storage directory.
    pub const GPTVAULT_VAULT_DIR: &str = "GPTVAULT_VAULT_DIR";
    /// Passphrase for non-interactive use. Skips the prompt when set.
    pub const GPTVAULT_PASSPHRASE: &str = "GPTVAULT_PASSPHRASE";
    /// Emit logs as JSON lines.
    pub const GPTVAULT_LOG_JSON: &str = "GPTVAULT_LOG_JSON";
}

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name).map(|v| parse_bool(&v)).unwrap_or(false)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_var_missing() {
        assert!(get_var("GPTVAULT_TEST_DEFINITELY_UNSET_VAR").is_none());
        assert!(!get_bool("GPTVAULT_TEST_DEFINITELY_UNSET_VAR"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool(""));
    }
}
