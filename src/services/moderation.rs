//! Moderation service implementation
//!
//! This service owns the warning/strike escalation state machine and the
//! per-chat moderation policy. Policy rows are materialized lazily from the
//! configured defaults, so warning an unknown chat is never a hard failure.

use chrono::Utc;
use tracing::{debug, info};

use crate::config::settings::Settings;
use crate::config::validation::{MUTE_MINUTES_RANGE, WARN_THRESHOLD_RANGE};
use crate::models::decision::{Escalation, EscalationAction, WarnOutcome};
use crate::models::moderation::{ChatModerationSettings, UpdateModerationSettingsRequest};
use crate::storage::ModerationStore;
use crate::utils::errors::{GroupWardenError, Result};
use crate::utils::logging::log_moderation_action;

/// Decide what a threshold breach escalates to.
///
/// Strikes persist across mutes, which is what lets the second breach turn
/// into a ban when `auto_ban_on_repeat` is set.
pub(crate) fn escalation_action(
    settings: &ChatModerationSettings,
    strikes: i32,
) -> EscalationAction {
    if settings.auto_ban_on_repeat && strikes >= 2 {
        EscalationAction::Ban
    } else {
        EscalationAction::Mute { minutes: settings.mute_minutes_default }
    }
}

/// Moderation service for warnings, strikes and chat policy
#[derive(Debug, Clone)]
pub struct ModerationService<S> {
    store: S,
    settings: Settings,
}

impl<S: ModerationStore> ModerationService<S> {
    /// Create a new ModerationService instance
    pub fn new(store: S, settings: Settings) -> Self {
        Self { store, settings }
    }

    fn default_settings(&self, chat_id: i64) -> ChatModerationSettings {
        let now = Utc::now();
        ChatModerationSettings {
            chat_id,
            warn_threshold: self.settings.moderation.warn_threshold,
            mute_minutes_default: self.settings.moderation.mute_minutes_default,
            auto_ban_on_repeat: self.settings.moderation.auto_ban_on_repeat,
            strikes_reset_on_mute: self.settings.moderation.strikes_reset_on_mute,
            anti_raid_enabled: self.settings.raid.enabled,
            raid_window_seconds: self.settings.raid.window_seconds,
            raid_join_threshold: self.settings.raid.join_threshold,
            raid_action: self.settings.raid.action,
            raid_action_minutes: self.settings.raid.action_minutes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get chat settings, materializing defaults for a chat seen first time
    pub async fn chat_settings(&self, chat_id: i64) -> Result<ChatModerationSettings> {
        if let Some(existing) = self.store.get_settings(chat_id).await? {
            return Ok(existing);
        }

        debug!(chat_id = chat_id, "Materializing default moderation settings");
        self.store.upsert_settings(self.default_settings(chat_id)).await
    }

    /// Apply an admin settings update after validating every changed field
    pub async fn update_settings(
        &self,
        chat_id: i64,
        request: UpdateModerationSettingsRequest,
    ) -> Result<ChatModerationSettings> {
        validate_update(&request)?;

        let mut settings = self.chat_settings(chat_id).await?;
        if let Some(threshold) = request.warn_threshold {
            settings.warn_threshold = threshold;
        }
        if let Some(minutes) = request.mute_minutes_default {
            settings.mute_minutes_default = minutes;
        }
        if let Some(auto_ban) = request.auto_ban_on_repeat {
            settings.auto_ban_on_repeat = auto_ban;
        }
        if let Some(reset) = request.strikes_reset_on_mute {
            settings.strikes_reset_on_mute = reset;
        }
        if let Some(enabled) = request.anti_raid_enabled {
            settings.anti_raid_enabled = enabled;
        }
        if let Some(window) = request.raid_window_seconds {
            settings.raid_window_seconds = window;
        }
        if let Some(threshold) = request.raid_join_threshold {
            settings.raid_join_threshold = threshold;
        }
        if let Some(action) = request.raid_action {
            settings.raid_action = action;
        }
        if let Some(minutes) = request.raid_action_minutes {
            settings.raid_action_minutes = minutes;
        }

        let updated = self.store.upsert_settings(settings).await?;
        info!(chat_id = chat_id, "Moderation settings updated");
        Ok(updated)
    }

    /// Record a warning and escalate if the threshold is reached.
    ///
    /// The increment is durably recorded before any punitive action is
    /// decided; a store failure surfaces as an error with no escalation, never
    /// as a guessed mute or ban.
    pub async fn warn(
        &self,
        chat_id: i64,
        user_id: i64,
        issuer_id: i64,
        reason: Option<String>,
    ) -> Result<WarnOutcome> {
        let warning = self.store.increment_warning(chat_id, user_id, reason).await?;
        let settings = self.chat_settings(chat_id).await?;

        info!(
            chat_id = chat_id,
            user_id = user_id,
            issuer_id = issuer_id,
            count = warning.count,
            threshold = settings.warn_threshold,
            "Warning recorded"
        );

        let mut escalation = None;
        if warning.count >= settings.warn_threshold {
            let strike = self.store.increment_strike(chat_id, user_id).await?;
            let action = escalation_action(&settings, strike.count);

            match action {
                EscalationAction::Ban => {
                    self.store.clear_warnings(chat_id, user_id).await?;
                    log_moderation_action(chat_id, user_id, "ban", Some(issuer_id));
                }
                EscalationAction::Mute { minutes } => {
                    if settings.strikes_reset_on_mute {
                        self.store.clear_warnings(chat_id, user_id).await?;
                    }
                    log_moderation_action(chat_id, user_id, "mute", Some(issuer_id));
                    debug!(chat_id = chat_id, user_id = user_id, minutes = minutes, "Mute duration");
                }
            }

            escalation = Some(Escalation { strikes: strike.count, action });
        }

        Ok(WarnOutcome {
            chat_id,
            user_id,
            count: warning.count,
            threshold: settings.warn_threshold,
            escalation,
        })
    }

    /// Current warning count; 0 when no row exists
    pub async fn warnings(&self, chat_id: i64, user_id: i64) -> Result<i32> {
        Ok(self
            .store
            .get_warning(chat_id, user_id)
            .await?
            .map(|w| w.count)
            .unwrap_or(0))
    }

    /// Clear a user's warnings. Idempotent.
    pub async fn clear_warnings(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.store.clear_warnings(chat_id, user_id).await?;
        info!(chat_id = chat_id, user_id = user_id, "Warnings cleared");
        Ok(())
    }

    /// Current strike count; 0 when no row exists
    pub async fn strikes(&self, chat_id: i64, user_id: i64) -> Result<i32> {
        Ok(self
            .store
            .get_strike(chat_id, user_id)
            .await?
            .map(|s| s.count)
            .unwrap_or(0))
    }

    /// Clear a user's strikes. Idempotent, admin-level.
    pub async fn clear_strikes(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.store.clear_strikes(chat_id, user_id).await?;
        info!(chat_id = chat_id, user_id = user_id, "Strikes cleared");
        Ok(())
    }
}

fn validate_update(request: &UpdateModerationSettingsRequest) -> Result<()> {
    if let Some(threshold) = request.warn_threshold {
        if !WARN_THRESHOLD_RANGE.contains(&threshold) {
            return Err(GroupWardenError::Validation(format!(
                "warn threshold must be within {WARN_THRESHOLD_RANGE:?}, got {threshold}"
            )));
        }
    }
    if let Some(minutes) = request.mute_minutes_default {
        if !MUTE_MINUTES_RANGE.contains(&minutes) {
            return Err(GroupWardenError::Validation(format!(
                "mute duration must be within {MUTE_MINUTES_RANGE:?} minutes, got {minutes}"
            )));
        }
    }
    if let Some(minutes) = request.raid_action_minutes {
        if !MUTE_MINUTES_RANGE.contains(&minutes) {
            return Err(GroupWardenError::Validation(format!(
                "raid action duration must be within {MUTE_MINUTES_RANGE:?} minutes, got {minutes}"
            )));
        }
    }
    if let Some(window) = request.raid_window_seconds {
        if window <= 0 {
            return Err(GroupWardenError::Validation(
                "raid window must be greater than 0 seconds".to_string(),
            ));
        }
    }
    if let Some(threshold) = request.raid_join_threshold {
        if threshold < 2 {
            return Err(GroupWardenError::Validation(
                "raid join threshold must be at least 2".to_string(),
            ));
        }
    }

    Ok(())
}
