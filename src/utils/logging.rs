//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for hosts embedding the engine.

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::models::decision::Decision;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "groupwarden.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(())
}

/// Log moderation actions with structured data
pub fn log_moderation_action(chat_id: i64, user_id: i64, action: &str, issuer_id: Option<i64>) {
    warn!(
        chat_id = chat_id,
        user_id = user_id,
        action = action,
        issuer_id = issuer_id,
        "Moderation action taken"
    );
}

/// Log raid detections
pub fn log_raid_detection(chat_id: i64, user_count: usize, action: &str) {
    warn!(
        chat_id = chat_id,
        user_count = user_count,
        action = action,
        "Raid detected"
    );
}

/// Log referral attribution
pub fn log_referral_attribution(referrer_id: i64, referred_id: i64, event_id: Option<i64>) {
    info!(
        referrer_id = referrer_id,
        referred_id = referred_id,
        event_id = event_id,
        "Referral attributed"
    );
}

/// Emit an audit record for an outbound decision
pub fn log_decision(decision: &Decision) {
    match serde_json::to_string(decision) {
        Ok(payload) => debug!(decision = %payload, "Decision emitted"),
        Err(e) => warn!(error = %e, "Failed to serialize decision for audit log"),
    }
}
