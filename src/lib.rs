//! GroupWarden moderation and referral engine
//!
//! The core engine behind a Telegram community bot: warning/strike escalation,
//! sliding-window raid detection, and a referral attribution graph with
//! event scoping and leaderboards. The chat platform adapter feeds typed
//! inbound events in and applies the typed decisions that come back out;
//! this crate owns no platform calls and no user-facing text.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{GroupWardenError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use models::{Decision, InboundEvent};
pub use services::{
    LeaderboardService, ModerationService, RaidDetector, ReferralService, ServiceFactory,
};
pub use storage::{EngineStore, MemoryStore, ModerationStore, ReferralStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
