//! Inactivity auto-lock through the full context.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gptvault_integration_tests::file_context;
use gptvault_secrets::VaultState;
use gptvault_session::{SessionConfigUpdate, SessionStatus};
use tempfile::TempDir;

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn test_default_timeout_cycle() {
    let dir = TempDir::new().unwrap();
    let ctx = file_context(dir.path()).await;
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let _sub = {
        let transitions = Arc::clone(&transitions);
        ctx.subscribe(move |state| {
            let mut seen = transitions.lock().unwrap();
            if seen.last() != Some(&state.status) {
                seen.push(state.status);
            }
        })
    };

    ctx.set_initial_passphrase("pw").await.unwrap();
    ctx.set_secret("openai", "sk").await.unwrap();

    tokio::time::sleep(25 * MINUTE + Duration::from_millis(500)).await;
    assert_eq!(ctx.status(), SessionStatus::Warning);
    let remaining = ctx.remaining_seconds().unwrap();
    assert!((299..=300).contains(&remaining), "remaining = {remaining}");

    tokio::time::sleep(5 * MINUTE).await;
    assert_eq!(ctx.status(), SessionStatus::Locked);
    assert_eq!(ctx.vault_state(), VaultState::Locked);
    assert_eq!(
        *transitions.lock().unwrap(),
        vec![
            SessionStatus::Unlocked,
            SessionStatus::Warning,
            SessionStatus::Locked
        ]
    );

    assert!(ctx.unlock("pw").await.unwrap());
    assert_eq!(ctx.get_secret("openai").await.unwrap().unwrap().expose_secret(), "sk");
}

#[tokio::test(start_paused = true)]
async fn test_extend_at_minute_26() {
    let dir = TempDir::new().unwrap();
    let ctx = file_context(dir.path()).await;
    ctx.set_initial_passphrase("pw").await.unwrap();

    tokio::time::sleep(26 * MINUTE).await;
    assert_eq!(ctx.status(), SessionStatus::Warning);
    assert!(ctx.extend_session());
    assert_eq!(ctx.status(), SessionStatus::Unlocked);

    tokio::time::sleep(29 * MINUTE).await;
    assert!(ctx.status().is_active());
    assert!(ctx.vault_state() == VaultState::Unlocked);

    tokio::time::sleep(MINUTE + Duration::from_secs(1)).await;
    assert_eq!(ctx.status(), SessionStatus::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_session_alive() {
    let dir = TempDir::new().unwrap();
    let ctx = file_context(dir.path()).await;
    ctx.set_initial_passphrase("pw").await.unwrap();

    for _ in 0..6 {
        tokio::time::sleep(10 * MINUTE).await;
        assert!(ctx.record_activity());
    }
    assert_eq!(ctx.status(), SessionStatus::Unlocked);

    ctx.lock();
    assert!(!ctx.record_activity());
}

#[tokio::test(start_paused = true)]
async fn test_persisted_bounds_apply_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = file_context(dir.path()).await;
        ctx.set_initial_passphrase("pw").await.unwrap();
        ctx.update_session_config(SessionConfigUpdate {
            timeout_minutes: Some(5),
            warning_minutes: Some(1),
        })
        .await
        .unwrap();
    }

    let ctx = file_context(dir.path()).await;
    assert_eq!(ctx.session_config().timeout_minutes, 5);
    assert!(ctx.unlock("pw").await.unwrap());

    tokio::time::sleep(4 * MINUTE + Duration::from_secs(1)).await;
    assert_eq!(ctx.status(), SessionStatus::Warning);
    tokio::time::sleep(MINUTE).await;
    assert_eq!(ctx.status(), SessionStatus::Locked);
}
