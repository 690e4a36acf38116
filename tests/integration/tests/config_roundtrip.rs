//! Config save/load roundtrip integration tests.

use gptvault_core::config::{Config, ConfigBuilder};
use gptvault_core::ConfigError;
use gptvault_integration_tests::{fast_kdf, write_test_config};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gptvault.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.session, config.session);
    assert_eq!(loaded.kdf, config.kdf);
    assert_eq!(loaded.logging.level, config.logging.level);
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = write_test_config(dir.path());

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.kdf, fast_kdf());
    assert_eq!(loaded.vault_dir().unwrap(), dir.path().join("vault"));
}

#[test]
fn test_config_hand_written_json5() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gptvault.json5");
    std::fs::write(
        &path,
        "{\n  // shared workstation\n  session: { timeout_minutes: 10, warning_minutes: 1 },\n  kdf: { iterations: 4 },\n}\n",
    )
    .unwrap();

    let loaded = Config::load_or_default(&path).unwrap();
    assert_eq!(loaded.session.timeout_minutes, 10);
    assert_eq!(loaded.kdf.iterations, 4);
    assert_eq!(loaded.kdf.memory_kib, Config::default().kdf.memory_kib);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/gptvault.json5"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_config_rejects_weak_kdf() {
    let mut config = ConfigBuilder::new().build();
    config.kdf.memory_kib = 1;
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}
