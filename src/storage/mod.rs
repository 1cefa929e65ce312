//! Persistence contract
//!
//! The engine talks to storage through these traits so that any relational or
//! key-value engine with an atomic increment-or-insert primitive can back it.
//! `database::DatabaseService` implements them over PostgreSQL;
//! [`memory::MemoryStore`] implements them in process memory for tests and
//! lightweight embeddings.
//!
//! All mutating operations are idempotent or atomically-upserting, so
//! at-least-once delivery of the surrounding event system never double-counts,
//! and unique-insert race losers resolve to no-ops rather than failures.

pub mod memory;

use async_trait::async_trait;

use crate::models::event::{CreateEventRequest, Event, EventParticipant, ReferralEdge};
use crate::models::moderation::{ChatModerationSettings, Strike, Warning};
use crate::models::user::{NewUserProfile, User};
use crate::utils::errors::Result;

pub use memory::MemoryStore;

/// Storage for per-chat policy, warnings and strikes
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn get_settings(&self, chat_id: i64) -> Result<Option<ChatModerationSettings>>;

    /// Insert-or-replace the settings row for `settings.chat_id`
    async fn upsert_settings(
        &self,
        settings: ChatModerationSettings,
    ) -> Result<ChatModerationSettings>;

    /// Atomic increment-or-insert of the warning counter.
    ///
    /// Concurrent calls on the same (chat, user) key must serialize into a
    /// correct monotonic sequence; the count never decreases here.
    async fn increment_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<Warning>;

    async fn get_warning(&self, chat_id: i64, user_id: i64) -> Result<Option<Warning>>;

    /// Reset the warning counter to zero. Idempotent.
    async fn clear_warnings(&self, chat_id: i64, user_id: i64) -> Result<()>;

    /// Atomic increment-or-insert of the strike counter
    async fn increment_strike(&self, chat_id: i64, user_id: i64) -> Result<Strike>;

    async fn get_strike(&self, chat_id: i64, user_id: i64) -> Result<Option<Strike>>;

    /// Reset the strike counter to zero. Idempotent.
    async fn clear_strikes(&self, chat_id: i64, user_id: i64) -> Result<()>;
}

/// Storage for users, events, memberships and referral edges
#[async_trait]
pub trait ReferralStore: Send + Sync {
    /// Create the user unless they already exist.
    ///
    /// Returns the stored row and whether this call inserted it. When the user
    /// already exists the call is a pure no-op: `referral_code` and
    /// `referred_by` of the existing row win.
    async fn create_user_if_absent(
        &self,
        profile: NewUserProfile,
        referral_code: String,
        referred_by: Option<i64>,
    ) -> Result<(User, bool)>;

    async fn find_user(&self, telegram_id: i64) -> Result<Option<User>>;

    async fn find_user_by_code(&self, code: &str) -> Result<Option<User>>;

    async fn find_users(&self, telegram_ids: &[i64]) -> Result<Vec<User>>;

    /// Record a referral edge unless one exists for this (referrer, referred)
    /// pair in this scope. Returns whether a row was written.
    async fn insert_edge(
        &self,
        referrer_id: i64,
        referred_id: i64,
        event_id: Option<i64>,
    ) -> Result<bool>;

    /// Every edge across all scopes
    async fn edges_global(&self) -> Result<Vec<ReferralEdge>>;

    /// Edges recorded within one event's scope
    async fn edges_for_event(&self, event_id: i64) -> Result<Vec<ReferralEdge>>;

    /// Distinct users referred by `referrer_id`, across all scopes
    async fn count_referrals(&self, referrer_id: i64) -> Result<i64>;

    async fn insert_event(
        &self,
        host_id: i64,
        event_code: String,
        request: CreateEventRequest,
    ) -> Result<Event>;

    async fn find_event(&self, event_id: i64) -> Result<Option<Event>>;

    async fn find_event_by_code(&self, code: &str) -> Result<Option<Event>>;

    async fn update_event_group_link(&self, event_id: i64, group_link: String) -> Result<Event>;

    /// Close the event: `is_active = false`, `ended_at = now`
    async fn end_event(&self, event_id: i64) -> Result<Event>;

    /// Idempotent membership insert; returns whether a row was written
    async fn add_participant(&self, event_id: i64, user_id: i64) -> Result<bool>;

    async fn is_participant(&self, event_id: i64, user_id: i64) -> Result<bool>;

    async fn participant_count(&self, event_id: i64) -> Result<i64>;

    /// Membership rows, ascending join time
    async fn participants(&self, event_id: i64) -> Result<Vec<EventParticipant>>;
}

/// Convenience alias for a store backing the whole engine
pub trait EngineStore: ModerationStore + ReferralStore {}

impl<T: ModerationStore + ReferralStore> EngineStore for T {}
