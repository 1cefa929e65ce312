//! Moderation repository implementation
//!
//! Warning and strike counters live behind atomic increment-or-insert
//! statements; a read-then-write sequence here would lose updates under
//! concurrent warns.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use crate::models::moderation::{ChatModerationSettings, RaidAction, Strike, Warning};
use crate::utils::errors::{GroupWardenError, Result};

/// Row shape for chat_settings; `raid_action` is stored as text
#[derive(Debug, FromRow)]
struct SettingsRow {
    chat_id: i64,
    warn_threshold: i32,
    mute_minutes_default: i64,
    auto_ban_on_repeat: bool,
    strikes_reset_on_mute: bool,
    anti_raid_enabled: bool,
    raid_window_seconds: i64,
    raid_join_threshold: i64,
    raid_action: String,
    raid_action_minutes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SettingsRow> for ChatModerationSettings {
    type Error = GroupWardenError;

    fn try_from(row: SettingsRow) -> Result<Self> {
        let raid_action = RaidAction::from_str(&row.raid_action)
            .map_err(GroupWardenError::Validation)?;
        Ok(ChatModerationSettings {
            chat_id: row.chat_id,
            warn_threshold: row.warn_threshold,
            mute_minutes_default: row.mute_minutes_default,
            auto_ban_on_repeat: row.auto_ban_on_repeat,
            strikes_reset_on_mute: row.strikes_reset_on_mute,
            anti_raid_enabled: row.anti_raid_enabled,
            raid_window_seconds: row.raid_window_seconds,
            raid_join_threshold: row.raid_join_threshold,
            raid_action,
            raid_action_minutes: row.raid_action_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ModerationRepository {
    pool: PgPool,
}

impl ModerationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find chat settings
    pub async fn find_settings(&self, chat_id: i64) -> Result<Option<ChatModerationSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT chat_id, warn_threshold, mute_minutes_default, auto_ban_on_repeat, strikes_reset_on_mute, anti_raid_enabled, raid_window_seconds, raid_join_threshold, raid_action, raid_action_minutes, created_at, updated_at FROM chat_settings WHERE chat_id = $1"
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChatModerationSettings::try_from).transpose()
    }

    /// Insert or replace chat settings
    pub async fn upsert_settings(
        &self,
        settings: ChatModerationSettings,
    ) -> Result<ChatModerationSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            INSERT INTO chat_settings (chat_id, warn_threshold, mute_minutes_default, auto_ban_on_repeat, strikes_reset_on_mute, anti_raid_enabled, raid_window_seconds, raid_join_threshold, raid_action, raid_action_minutes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (chat_id) DO UPDATE
            SET warn_threshold = EXCLUDED.warn_threshold,
                mute_minutes_default = EXCLUDED.mute_minutes_default,
                auto_ban_on_repeat = EXCLUDED.auto_ban_on_repeat,
                strikes_reset_on_mute = EXCLUDED.strikes_reset_on_mute,
                anti_raid_enabled = EXCLUDED.anti_raid_enabled,
                raid_window_seconds = EXCLUDED.raid_window_seconds,
                raid_join_threshold = EXCLUDED.raid_join_threshold,
                raid_action = EXCLUDED.raid_action,
                raid_action_minutes = EXCLUDED.raid_action_minutes,
                updated_at = EXCLUDED.updated_at
            RETURNING chat_id, warn_threshold, mute_minutes_default, auto_ban_on_repeat, strikes_reset_on_mute, anti_raid_enabled, raid_window_seconds, raid_join_threshold, raid_action, raid_action_minutes, created_at, updated_at
            "#
        )
        .bind(settings.chat_id)
        .bind(settings.warn_threshold)
        .bind(settings.mute_minutes_default)
        .bind(settings.auto_ban_on_repeat)
        .bind(settings.strikes_reset_on_mute)
        .bind(settings.anti_raid_enabled)
        .bind(settings.raid_window_seconds)
        .bind(settings.raid_join_threshold)
        .bind(settings.raid_action.to_string())
        .bind(settings.raid_action_minutes)
        .bind(settings.created_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        ChatModerationSettings::try_from(row)
    }

    /// Atomically increment the warning counter, creating the row if absent
    pub async fn increment_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<Warning> {
        let warning = sqlx::query_as::<_, Warning>(
            r#"
            INSERT INTO warnings (chat_id, user_id, count, last_reason, updated_at)
            VALUES ($1, $2, 1, $3, $4)
            ON CONFLICT (chat_id, user_id) DO UPDATE
            SET count = warnings.count + 1,
                last_reason = COALESCE(EXCLUDED.last_reason, warnings.last_reason),
                updated_at = EXCLUDED.updated_at
            RETURNING chat_id, user_id, count, last_reason, updated_at
            "#
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(reason)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(warning)
    }

    /// Find the warning row for a (chat, user) pair
    pub async fn find_warning(&self, chat_id: i64, user_id: i64) -> Result<Option<Warning>> {
        let warning = sqlx::query_as::<_, Warning>(
            "SELECT chat_id, user_id, count, last_reason, updated_at FROM warnings WHERE chat_id = $1 AND user_id = $2"
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(warning)
    }

    /// Clear warnings for a (chat, user) pair
    pub async fn clear_warnings(&self, chat_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM warnings WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Atomically increment the strike counter, creating the row if absent
    pub async fn increment_strike(&self, chat_id: i64, user_id: i64) -> Result<Strike> {
        let strike = sqlx::query_as::<_, Strike>(
            r#"
            INSERT INTO strikes (chat_id, user_id, count, updated_at)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (chat_id, user_id) DO UPDATE
            SET count = strikes.count + 1,
                updated_at = EXCLUDED.updated_at
            RETURNING chat_id, user_id, count, updated_at
            "#
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(strike)
    }

    /// Find the strike row for a (chat, user) pair
    pub async fn find_strike(&self, chat_id: i64, user_id: i64) -> Result<Option<Strike>> {
        let strike = sqlx::query_as::<_, Strike>(
            "SELECT chat_id, user_id, count, updated_at FROM strikes WHERE chat_id = $1 AND user_id = $2"
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(strike)
    }

    /// Clear strikes for a (chat, user) pair
    pub async fn clear_strikes(&self, chat_id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM strikes WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
