//! Event and referral-graph models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A hosted referral campaign with its own membership and leaderboard window
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub event_code: String,
    pub title: String,
    pub description: Option<String>,
    pub host_id: i64,
    pub group_link: Option<String>,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Event {
    /// The time range over which this event's referral edges are counted.
    ///
    /// An explicit window wins; otherwise the window opens at creation and
    /// closes at `ended_at` once the event is over, or stays open until `now`.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.starts_at.unwrap_or(self.created_at);
        let end = match self.ends_at {
            Some(end) => end,
            None if self.is_active => now,
            None => self.ended_at.unwrap_or(now),
        };
        (start, end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventParticipant {
    pub event_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
}

/// A single attribution: `referrer` brought `referred` in, optionally within
/// an event. Write-once per (referrer, referred) pair per scope.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferralEdge {
    pub referrer_id: i64,
    pub referred_id: i64,
    pub event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub group_link: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}
