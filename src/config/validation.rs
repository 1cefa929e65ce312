//! Configuration validation module
//!
//! This module provides validation functions for engine configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{GroupWardenError, Result};

/// Bounds shared by config defaults and per-chat admin updates
pub const WARN_THRESHOLD_RANGE: std::ops::RangeInclusive<i32> = 1..=10;
pub const MUTE_MINUTES_RANGE: std::ops::RangeInclusive<i64> = 1..=10080;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_moderation_config(&settings.moderation)?;
    validate_raid_config(&settings.raid)?;
    validate_referral_config(&settings.referral)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(GroupWardenError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(GroupWardenError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(GroupWardenError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate moderation defaults
fn validate_moderation_config(config: &super::ModerationConfig) -> Result<()> {
    if !WARN_THRESHOLD_RANGE.contains(&config.warn_threshold) {
        return Err(GroupWardenError::Config(format!(
            "Warn threshold must be within {:?}",
            WARN_THRESHOLD_RANGE
        )));
    }

    if !MUTE_MINUTES_RANGE.contains(&config.mute_minutes_default) {
        return Err(GroupWardenError::Config(format!(
            "Default mute duration must be within {:?} minutes",
            MUTE_MINUTES_RANGE
        )));
    }

    Ok(())
}

/// Validate anti-raid defaults
fn validate_raid_config(config: &super::RaidConfig) -> Result<()> {
    if config.window_seconds <= 0 {
        return Err(GroupWardenError::Config(
            "Raid window must be greater than 0 seconds".to_string()
        ));
    }

    if config.join_threshold < 2 {
        return Err(GroupWardenError::Config(
            "Raid join threshold must be at least 2".to_string()
        ));
    }

    if !MUTE_MINUTES_RANGE.contains(&config.action_minutes) {
        return Err(GroupWardenError::Config(format!(
            "Raid action duration must be within {:?} minutes",
            MUTE_MINUTES_RANGE
        )));
    }

    if config.sweep_interval_seconds == 0 {
        return Err(GroupWardenError::Config(
            "Sweep interval must be greater than 0 seconds".to_string()
        ));
    }

    Ok(())
}

/// Validate referral configuration
fn validate_referral_config(config: &super::ReferralConfig) -> Result<()> {
    if config.bot_username.is_empty() {
        return Err(GroupWardenError::Config(
            "Bot username is required for referral links".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(GroupWardenError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(GroupWardenError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
