//! Moderation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Action applied to every member of a detected raid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaidAction {
    Mute,
    Ban,
}

impl fmt::Display for RaidAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaidAction::Mute => write!(f, "mute"),
            RaidAction::Ban => write!(f, "ban"),
        }
    }
}

impl FromStr for RaidAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mute" => Ok(RaidAction::Mute),
            "ban" => Ok(RaidAction::Ban),
            other => Err(format!("unknown raid action: {other}")),
        }
    }
}

/// Per-chat moderation configuration.
///
/// Created lazily with defaults the first time a chat is seen; mutated only by
/// admin-level operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatModerationSettings {
    pub chat_id: i64,
    pub warn_threshold: i32,
    pub mute_minutes_default: i64,
    pub auto_ban_on_repeat: bool,
    pub strikes_reset_on_mute: bool,
    pub anti_raid_enabled: bool,
    pub raid_window_seconds: i64,
    pub raid_join_threshold: i64,
    pub raid_action: RaidAction,
    pub raid_action_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin update request; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateModerationSettingsRequest {
    pub warn_threshold: Option<i32>,
    pub mute_minutes_default: Option<i64>,
    pub auto_ban_on_repeat: Option<bool>,
    pub strikes_reset_on_mute: Option<bool>,
    pub anti_raid_enabled: Option<bool>,
    pub raid_window_seconds: Option<i64>,
    pub raid_join_threshold: Option<i64>,
    pub raid_action: Option<RaidAction>,
    pub raid_action_minutes: Option<i64>,
}

/// Accumulated warnings for one (chat, user) pair
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Warning {
    pub chat_id: i64,
    pub user_id: i64,
    pub count: i32,
    pub last_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Threshold breaches for one (chat, user) pair
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Strike {
    pub chat_id: i64,
    pub user_id: i64,
    pub count: i32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raid_action_round_trip() {
        assert_eq!("mute".parse::<RaidAction>().unwrap(), RaidAction::Mute);
        assert_eq!("ban".parse::<RaidAction>().unwrap(), RaidAction::Ban);
        assert_eq!(RaidAction::Mute.to_string(), "mute");
        assert!("kick".parse::<RaidAction>().is_err());
    }
}
