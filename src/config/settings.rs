//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

use crate::models::moderation::RaidAction;

/// Main engine configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub moderation: ModerationConfig,
    pub raid: RaidConfig,
    pub referral: ReferralConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Defaults for lazily-created per-chat moderation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModerationConfig {
    pub warn_threshold: i32,
    pub mute_minutes_default: i64,
    pub auto_ban_on_repeat: bool,
    pub strikes_reset_on_mute: bool,
}

/// Defaults for per-chat anti-raid settings and the background sweep
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RaidConfig {
    pub enabled: bool,
    pub window_seconds: i64,
    pub join_threshold: i64,
    pub action: RaidAction,
    pub action_minutes: i64,
    pub sweep_interval_seconds: u64,
}

/// Referral link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferralConfig {
    /// Bot account the `t.me/<bot>?start=<code>` links point at
    pub bot_username: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub max_files: u32,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("GROUPWARDEN"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::GroupWardenError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/groupwarden".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            moderation: ModerationConfig {
                warn_threshold: 3,
                mute_minutes_default: 10,
                auto_ban_on_repeat: true,
                strikes_reset_on_mute: true,
            },
            raid: RaidConfig {
                enabled: false,
                window_seconds: 60,
                join_threshold: 5,
                action: RaidAction::Mute,
                action_minutes: 60,
                sweep_interval_seconds: 300,
            },
            referral: ReferralConfig {
                bot_username: "GroupWardenBot".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/groupwarden".to_string(),
                max_files: 5,
            },
        }
    }
}
