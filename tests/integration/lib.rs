//! Shared fixtures for the integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gptvault_context::{ContextOptions, VaultContext};
use gptvault_core::config::ConfigBuilder;
use gptvault_core::KdfConfig;
use gptvault_secrets::{FileStore, KdfParams};

/// Cheapest Argon2 cost the library accepts.
pub fn fast_kdf() -> KdfConfig {
    KdfConfig {
        iterations: 1,
        memory_kib: 8,
        parallelism: 1,
    }
}

pub fn test_options() -> ContextOptions {
    ContextOptions::default().with_kdf(KdfParams::from(fast_kdf()))
}

/// Open a context over a file store rooted at `dir`.
pub async fn file_context(dir: &Path) -> VaultContext {
    VaultContext::open(Arc::new(FileStore::new(dir)), test_options())
        .await
        .expect("open vault context")
}

/// Write a config under `root` whose vault lives in `root/vault`.
pub fn write_test_config(root: &Path) -> PathBuf {
    let path = root.join("gptvault.json5");
    ConfigBuilder::new()
        .kdf(fast_kdf())
        .storage_dir(root.join("vault"))
        .build()
        .save(&path)
        .expect("write test config");
    path
}
