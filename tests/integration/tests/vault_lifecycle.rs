//! End-to-end vault behaviour over the on-disk store.

use gptvault_context::VaultContext;
use gptvault_integration_tests::file_context;
use gptvault_secrets::VaultState;
use gptvault_session::SessionStatus;
use std::path::Path;
use tempfile::TempDir;

async fn initialized(dir: &Path, passphrase: &str) -> VaultContext {
    let ctx = file_context(dir).await;
    ctx.set_initial_passphrase(passphrase).await.unwrap();
    ctx
}

fn read_all_files(dir: &Path) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                bytes.extend(std::fs::read(&path).unwrap());
            }
        }
    }
    bytes
}

#[tokio::test]
async fn test_secrets_survive_process_restart() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = initialized(dir.path(), "restart me").await;
        ctx.set_secret("openai", "sk-openai-abc").await.unwrap();
        ctx.set_secret("anthropic", "sk-ant-def").await.unwrap();
    }

    let ctx = file_context(dir.path()).await;
    assert!(ctx.has_secrets());
    assert_eq!(ctx.status(), SessionStatus::Locked);
    assert_eq!(ctx.vault_state(), VaultState::Locked);

    assert!(ctx.unlock("restart me").await.unwrap());
    assert_eq!(
        ctx.get_secret("openai").await.unwrap().unwrap().expose_secret(),
        "sk-openai-abc"
    );
    assert_eq!(
        ctx.get_secret("anthropic").await.unwrap().unwrap().expose_secret(),
        "sk-ant-def"
    );
}

#[tokio::test]
async fn test_wrong_passphrase_after_restart() {
    let dir = TempDir::new().unwrap();
    drop(initialized(dir.path(), "right").await);

    let ctx = file_context(dir.path()).await;
    assert!(!ctx.unlock("wrong").await.unwrap());
    assert_eq!(ctx.status(), SessionStatus::Locked);
    assert!(ctx.get_secret("openai").await.unwrap_err().is_session_locked());
}

#[tokio::test]
async fn test_nothing_sensitive_on_disk() {
    let dir = TempDir::new().unwrap();
    let ctx = initialized(dir.path(), "disk passphrase").await;
    ctx.set_secret("openai", "sk-plaintext-marker").await.unwrap();

    let on_disk = String::from_utf8_lossy(&read_all_files(dir.path())).into_owned();
    assert!(!on_disk.contains("sk-plaintext-marker"));
    assert!(!on_disk.contains("disk passphrase"));
    assert!(on_disk.contains("\"provider\":\"openai\""));
}

#[tokio::test]
async fn test_change_passphrase_persists() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = initialized(dir.path(), "first").await;
        ctx.set_secret("openai", "sk-1").await.unwrap();
        ctx.set_secret("mistral", "sk-2").await.unwrap();
        ctx.change_passphrase("first", "second").await.unwrap();
    }

    let ctx = file_context(dir.path()).await;
    assert!(!ctx.unlock("first").await.unwrap());
    assert!(ctx.unlock("second").await.unwrap());
    assert_eq!(
        ctx.get_secret("mistral").await.unwrap().unwrap().expose_secret(),
        "sk-2"
    );
}

#[tokio::test]
async fn test_reset_then_reinitialize() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = initialized(dir.path(), "old").await;
        ctx.set_secret("openai", "sk-old").await.unwrap();
        ctx.reset_all_data().await.unwrap();
        assert!(!ctx.has_secrets());
    }

    let ctx = file_context(dir.path()).await;
    assert!(!ctx.has_secrets());
    assert!(ctx.list_providers().await.unwrap().is_empty());

    ctx.set_initial_passphrase("new").await.unwrap();
    assert!(ctx.get_secret("openai").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_while_locked_and_delete_idempotent() {
    let dir = TempDir::new().unwrap();
    let ctx = initialized(dir.path(), "pw").await;
    ctx.set_secret("openai", "a").await.unwrap();
    ctx.set_secret("groq", "b").await.unwrap();
    ctx.lock();

    let providers: Vec<String> = ctx
        .list_providers()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.provider)
        .collect();
    assert_eq!(providers, vec!["groq", "openai"]);

    assert!(ctx.unlock("pw").await.unwrap());
    ctx.delete_secret("groq").await.unwrap();
    ctx.delete_secret("groq").await.unwrap();
    ctx.delete_secret("never-existed").await.unwrap();
    assert!(!ctx.has_secret("groq").await.unwrap());
}

#[tokio::test]
async fn test_tampered_file_is_decryption_failure() {
    let dir = TempDir::new().unwrap();
    let ctx = initialized(dir.path(), "pw").await;
    ctx.set_secret("openai", "sk-good").await.unwrap();
    ctx.set_secret("anthropic", "sk-also-good").await.unwrap();

    let path = dir.path().join("secrets").join("openai.rec");
    let mut record: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    record["iv"] = serde_json::Value::String("AAAAAAAAAAAAAAAA".to_string());
    std::fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();

    let err = ctx.get_secret("openai").await.unwrap_err();
    assert!(err.is_decryption_failure());
    assert_eq!(ctx.status(), SessionStatus::Unlocked);
    assert_eq!(
        ctx.get_secret("anthropic").await.unwrap().unwrap().expose_secret(),
        "sk-also-good"
    );
}
