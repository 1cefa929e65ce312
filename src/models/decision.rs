//! Inbound events and outbound decisions
//!
//! The engine's boundary: the host adapter classifies platform traffic into
//! `InboundEvent` values and turns the returned `Decision` values into
//! platform API calls. Both enums are closed and matched exhaustively, so no
//! string-tag dispatch leaks into the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::event::{Event, EventParticipant};
use crate::models::moderation::RaidAction;
use crate::models::user::{NewUserProfile, User};

/// Events the engine consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundEvent {
    UserJoined {
        chat_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    },
    WarnRequested {
        chat_id: i64,
        user_id: i64,
        issuer_id: i64,
        reason: Option<String>,
    },
    StartCommand {
        profile: NewUserProfile,
        arg: Option<String>,
    },
    CreateEventRequested {
        host_id: i64,
        title: String,
        description: Option<String>,
        group_link: Option<String>,
    },
    LeaderboardRequested {
        scope: LeaderboardScope,
        limit: i64,
    },
}

/// Decisions the engine produces; the adapter applies them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decision {
    MuteUser {
        chat_id: i64,
        user_id: i64,
        duration_minutes: i64,
    },
    BanUser {
        chat_id: i64,
        user_id: i64,
    },
    RaidDetected {
        chat_id: i64,
        user_ids: Vec<i64>,
        action: RaidAction,
        duration_minutes: i64,
    },
    ReferralAttributed {
        referrer_id: i64,
        referred_id: i64,
        event_id: Option<i64>,
    },
    EventCreated {
        event_id: i64,
        event_code: String,
        host_id: i64,
    },
    LeaderboardRows {
        scope: LeaderboardScope,
        rows: Vec<LeaderboardRow>,
    },
}

/// Result of a `warn` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarnOutcome {
    pub chat_id: i64,
    pub user_id: i64,
    pub count: i32,
    pub threshold: i32,
    pub escalation: Option<Escalation>,
}

/// What happened when the warning threshold was reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    pub strikes: i32,
    pub action: EscalationAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationAction {
    Mute { minutes: i64 },
    Ban,
}

/// A sliding-window raid detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidDetection {
    pub chat_id: i64,
    pub action: RaidAction,
    pub duration_minutes: i64,
    /// Every user inside the window, ascending join time (the just-joined
    /// user included); the caller applies the action to all of them.
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderboardScope {
    Global,
    Event(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: i64,
    pub display_name: String,
    pub referral_count: i64,
    pub first_referral_at: DateTime<Utc>,
}

/// Result of registering a user (directly or via `/start`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOutcome {
    pub user: User,
    /// False when the user already existed and nothing was written
    pub created: bool,
    pub attribution: Option<Attribution>,
    pub joined_event: Option<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub referrer_id: i64,
    pub referred_id: i64,
    pub event_id: Option<i64>,
}

/// Result of the `/start <code>` flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartOutcome {
    pub user: User,
    pub created: bool,
    pub referral_code: String,
    pub attribution: Option<Attribution>,
    pub joined_event: Option<Event>,
    /// Group the adapter should offer to redirect the user into
    pub redirect_group_link: Option<String>,
}

/// Result of joining an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub event: Event,
    pub newly_joined: bool,
}

/// Aggregates for an event's stats screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStats {
    pub event: Event,
    pub participant_count: i64,
    pub referral_count: i64,
    /// Membership roll, ascending join time
    pub participants: Vec<EventParticipant>,
}

/// Per-user referral statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: i64,
    pub referral_code: String,
    pub total_referrals: i64,
    /// 1-based position on the global leaderboard; `None` with no referrals
    pub global_rank: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serialization() {
        let decision = Decision::RaidDetected {
            chat_id: 7,
            user_ids: vec![1, 2, 3],
            action: RaidAction::Mute,
            duration_minutes: 60,
        };

        let serialized = serde_json::to_string(&decision).unwrap();
        let deserialized: Decision = serde_json::from_str(&serialized).unwrap();
        match deserialized {
            Decision::RaidDetected { chat_id, user_ids, action, duration_minutes } => {
                assert_eq!(chat_id, 7);
                assert_eq!(user_ids, vec![1, 2, 3]);
                assert_eq!(action, RaidAction::Mute);
                assert_eq!(duration_minutes, 60);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }
}
