//! Data models for the engine

pub mod decision;
pub mod event;
pub mod moderation;
pub mod user;

pub use decision::{
    Attribution, Decision, Escalation, EscalationAction, EventStats, InboundEvent, JoinOutcome,
    LeaderboardRow, LeaderboardScope, RaidDetection, RegisterOutcome, StartOutcome, UserStats,
    WarnOutcome,
};
pub use event::{CreateEventRequest, Event, EventParticipant, ReferralEdge};
pub use moderation::{
    ChatModerationSettings, RaidAction, Strike, UpdateModerationSettingsRequest, Warning,
};
pub use user::{NewUserProfile, User};
