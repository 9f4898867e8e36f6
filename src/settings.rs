//! Manager settings.
//!
//! Loaded once at startup from JSON. Every field has a default, so a partial
//! (or missing) file still produces a usable configuration.

use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Timer options, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// Open phase before prestart
    pub start: u32,
    /// Prestart countdown
    pub prestart: u32,
    /// Dropped backpack lifetime
    pub backpack_despawn: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            start: 60,
            prestart: 10,
            backpack_despawn: 30,
        }
    }
}

/// How rewards are paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardKind {
    /// Scrap added to the restored inventory
    Scrap,
    /// Reward points
    ServerRewards,
    /// Currency balance
    Economics,
}

/// Reward amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSettings {
    pub kill_amount: i32,
    pub win_amount: i32,
    pub headshot_amount: i32,
    pub kind: RewardKind,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            kill_amount: 1,
            win_amount: 5,
            headshot_amount: 2,
            kind: RewardKind::Scrap,
        }
    }
}

/// Which announcements are broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    pub broadcast_joiners: bool,
    pub broadcast_leavers: bool,
    pub broadcast_winners: bool,
    pub broadcast_kills: bool,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            broadcast_joiners: true,
            broadcast_leavers: true,
            broadcast_winners: true,
            broadcast_kills: true,
        }
    }
}

/// Settings load errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub timers: TimerSettings,
    pub rewards: RewardSettings,
    pub messages: MessageSettings,

    /// Commands event players may not run
    pub blacklisted_commands: Vec<String>,

    /// Delay between restore attempts while a player is not ready
    pub restore_retry_secs: u32,

    /// Delay between materializing two waiting players
    pub spawn_stagger_ms: u64,

    /// Scrap item id used for scrap rewards
    pub scrap_item_id: i32,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            timers: TimerSettings::default(),
            rewards: RewardSettings::default(),
            messages: MessageSettings::default(),
            blacklisted_commands: vec!["s".to_string(), "tp".to_string()],
            restore_retry_secs: 1,
            spawn_stagger_ms: 100,
            scrap_item_id: -932200100,
        }
    }
}

impl ManagerSettings {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from disk. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ManagerSettings::default();
        assert_eq!(settings.timers.start, 60);
        assert_eq!(settings.timers.prestart, 10);
        assert_eq!(settings.rewards.win_amount, 5);
        assert_eq!(settings.blacklisted_commands, vec!["s", "tp"]);
    }

    #[test]
    fn test_partial_json() {
        let settings = ManagerSettings::from_json_str(
            r#"{ "timers": { "start": 30 }, "rewards": { "kind": "Economics" } }"#,
        )
        .unwrap();

        assert_eq!(settings.timers.start, 30);
        assert_eq!(settings.timers.prestart, 10);
        assert_eq!(settings.rewards.kind, RewardKind::Economics);
        assert_eq!(settings.rewards.kill_amount, 1);
        assert_eq!(settings.restore_retry_secs, 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(ManagerSettings::from_json_str("{"), Err(SettingsError::Json(_))));
    }
}
