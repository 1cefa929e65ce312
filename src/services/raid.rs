//! Raid detection service
//!
//! Flags bursts of joins that resemble a coordinated raid. State is a
//! process-local sliding window per chat; a restart loses history, which is
//! acceptable because raids are a real-time phenomenon. Entries survive a
//! detection, so the same window keeps firing while suspicious joins continue;
//! only the periodic sweep removes them.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::decision::RaidDetection;
use crate::models::moderation::ChatModerationSettings;
use crate::utils::logging::log_raid_detection;

/// Join entries older than this are swept regardless of any per-chat window
pub const JOIN_RETENTION_SECONDS: i64 = 3600;

/// Time source, injected so tests can control the sweep cutoff
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Sliding-window join tracker
pub struct RaidDetector {
    /// chat_id -> user_id -> last join time; keyed by user so a rapid
    /// leave/rejoin counts once
    joins: Mutex<HashMap<i64, HashMap<i64, DateTime<Utc>>>>,
    clock: Arc<dyn Clock>,
}

impl RaidDetector {
    /// Create a new RaidDetector on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new RaidDetector with an injected clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { joins: Mutex::new(HashMap::new()), clock }
    }

    /// Record a join and check the chat's window.
    ///
    /// Returns a detection carrying every user inside the window (ascending
    /// join time, the just-joined user included) once the count reaches the
    /// chat's threshold; the caller applies the configured action to all of
    /// them.
    pub fn check_raid(
        &self,
        chat_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
        settings: &ChatModerationSettings,
    ) -> Option<RaidDetection> {
        if !settings.anti_raid_enabled {
            return None;
        }

        let window = Duration::seconds(settings.raid_window_seconds);
        let mut joins = self.joins.lock().expect("raid join map lock poisoned");
        let chat_joins = joins.entry(chat_id).or_default();
        chat_joins.insert(user_id, at);

        let mut recent: Vec<(DateTime<Utc>, i64)> = chat_joins
            .iter()
            .filter(|(_, &t)| at.signed_duration_since(t) <= window)
            .map(|(&u, &t)| (t, u))
            .collect();

        if (recent.len() as i64) < settings.raid_join_threshold {
            return None;
        }

        recent.sort();
        let user_ids: Vec<i64> = recent.into_iter().map(|(_, u)| u).collect();
        log_raid_detection(chat_id, user_ids.len(), &settings.raid_action.to_string());

        Some(RaidDetection {
            chat_id,
            action: settings.raid_action,
            duration_minutes: settings.raid_action_minutes,
            user_ids,
        })
    }

    /// Drop join entries older than the retention ceiling for every chat.
    /// Returns the number of entries removed.
    pub fn prune(&self) -> usize {
        let cutoff = self.clock.now() - Duration::seconds(JOIN_RETENTION_SECONDS);
        let mut joins = self.joins.lock().expect("raid join map lock poisoned");

        let before: usize = joins.values().map(HashMap::len).sum();
        for chat_joins in joins.values_mut() {
            chat_joins.retain(|_, &mut t| t > cutoff);
        }
        joins.retain(|_, chat_joins| !chat_joins.is_empty());
        let after: usize = joins.values().map(HashMap::len).sum();

        let removed = before - after;
        if removed > 0 {
            debug!(removed = removed, remaining = after, "Pruned raid join entries");
        }
        removed
    }

    /// Total tracked join entries across all chats
    pub fn tracked_joins(&self) -> usize {
        self.joins
            .lock()
            .expect("raid join map lock poisoned")
            .values()
            .map(HashMap::len)
            .sum()
    }
}

impl Default for RaidDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `prune()` on a timer. The task has no caller waiting on it and only
/// ever logs; foreground request handling is unaffected by it.
pub fn spawn_sweeper(
    detector: Arc<RaidDetector>,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            detector.prune();
        }
    })
}
