//! Observable session state.

use gptvault_core::SessionConfig;
use serde::{Deserialize, Serialize};

/// Coarse session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Locked,
    Unlocked,
    /// Still unlocked, but the inactivity timeout is close.
    Warning,
}

impl SessionStatus {
    /// Whether secrets may be read or written in this status.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Unlocked | Self::Warning)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,

    /// Seconds until the session locks. Only set while in `warning`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
}

impl SessionState {
    pub fn locked() -> Self {
        Self::default()
    }
}

/// Partial update for [`SessionConfig`]. Unset fields keep their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionConfigUpdate {
    #[serde(default)]
    pub timeout_minutes: Option<u32>,
    #[serde(default)]
    pub warning_minutes: Option<u32>,
}

impl SessionConfigUpdate {
    /// Apply on top of `base`. The result is not validated.
    pub fn apply(&self, base: SessionConfig) -> SessionConfig {
        SessionConfig {
            timeout_minutes: self.timeout_minutes.unwrap_or(base.timeout_minutes),
            warning_minutes: self.warning_minutes.unwrap_or(base.warning_minutes),
        }
    }
}

impl From<SessionConfig> for SessionConfigUpdate {
    fn from(config: SessionConfig) -> Self {
        Self {
            timeout_minutes: Some(config.timeout_minutes),
            warning_minutes: Some(config.warning_minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Warning).unwrap(),
            "\"warning\""
        );
        let state = SessionState {
            status: SessionStatus::Warning,
            remaining_seconds: Some(42),
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"status":"warning","remaining_seconds":42}"#
        );
        assert_eq!(
            serde_json::to_string(&SessionState::locked()).unwrap(),
            r#"{"status":"locked"}"#
        );
    }

    #[test]
    fn test_update_apply_partial() {
        let base = SessionConfig::default();
        let update = SessionConfigUpdate {
            timeout_minutes: Some(60),
            warning_minutes: None,
        };
        let merged = update.apply(base);
        assert_eq!(merged.timeout_minutes, 60);
        assert_eq!(merged.warning_minutes, base.warning_minutes);
    }

    #[test]
    fn test_is_active() {
        assert!(!SessionStatus::Locked.is_active());
        assert!(SessionStatus::Unlocked.is_active());
        assert!(SessionStatus::Warning.is_active());
    }
}
