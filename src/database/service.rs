//! Database service layer
//!
//! `DatabaseService` bundles the repositories and satisfies the storage
//! contract, so the engine services run unchanged over PostgreSQL.

use async_trait::async_trait;

use crate::database::connection::DatabasePool;
use crate::database::repositories::{EventRepository, ModerationRepository, UserRepository};
use crate::models::event::{CreateEventRequest, Event, EventParticipant, ReferralEdge};
use crate::models::moderation::{ChatModerationSettings, Strike, Warning};
use crate::models::user::{NewUserProfile, User};
use crate::storage::{ModerationStore, ReferralStore};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub moderation: ModerationRepository,
    pub users: UserRepository,
    pub events: EventRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            moderation: ModerationRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool),
        }
    }
}

#[async_trait]
impl ModerationStore for DatabaseService {
    async fn get_settings(&self, chat_id: i64) -> Result<Option<ChatModerationSettings>> {
        self.moderation.find_settings(chat_id).await
    }

    async fn upsert_settings(
        &self,
        settings: ChatModerationSettings,
    ) -> Result<ChatModerationSettings> {
        self.moderation.upsert_settings(settings).await
    }

    async fn increment_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<Warning> {
        self.moderation.increment_warning(chat_id, user_id, reason).await
    }

    async fn get_warning(&self, chat_id: i64, user_id: i64) -> Result<Option<Warning>> {
        self.moderation.find_warning(chat_id, user_id).await
    }

    async fn clear_warnings(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.moderation.clear_warnings(chat_id, user_id).await
    }

    async fn increment_strike(&self, chat_id: i64, user_id: i64) -> Result<Strike> {
        self.moderation.increment_strike(chat_id, user_id).await
    }

    async fn get_strike(&self, chat_id: i64, user_id: i64) -> Result<Option<Strike>> {
        self.moderation.find_strike(chat_id, user_id).await
    }

    async fn clear_strikes(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.moderation.clear_strikes(chat_id, user_id).await
    }
}

#[async_trait]
impl ReferralStore for DatabaseService {
    async fn create_user_if_absent(
        &self,
        profile: NewUserProfile,
        referral_code: String,
        referred_by: Option<i64>,
    ) -> Result<(User, bool)> {
        self.users.create_if_absent(profile, referral_code, referred_by).await
    }

    async fn find_user(&self, telegram_id: i64) -> Result<Option<User>> {
        self.users.find_by_telegram_id(telegram_id).await
    }

    async fn find_user_by_code(&self, code: &str) -> Result<Option<User>> {
        self.users.find_by_referral_code(code).await
    }

    async fn find_users(&self, telegram_ids: &[i64]) -> Result<Vec<User>> {
        self.users.find_many(telegram_ids).await
    }

    async fn insert_edge(
        &self,
        referrer_id: i64,
        referred_id: i64,
        event_id: Option<i64>,
    ) -> Result<bool> {
        self.events.insert_edge(referrer_id, referred_id, event_id).await
    }

    async fn edges_global(&self) -> Result<Vec<ReferralEdge>> {
        self.events.edges().await
    }

    async fn edges_for_event(&self, event_id: i64) -> Result<Vec<ReferralEdge>> {
        self.events.edges_for_event(event_id).await
    }

    async fn count_referrals(&self, referrer_id: i64) -> Result<i64> {
        self.events.count_referrals(referrer_id).await
    }

    async fn insert_event(
        &self,
        host_id: i64,
        event_code: String,
        request: CreateEventRequest,
    ) -> Result<Event> {
        self.events.create(host_id, event_code, request).await
    }

    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        self.events.find_by_id(event_id).await
    }

    async fn find_event_by_code(&self, code: &str) -> Result<Option<Event>> {
        self.events.find_by_code(code).await
    }

    async fn update_event_group_link(&self, event_id: i64, group_link: String) -> Result<Event> {
        self.events.update_group_link(event_id, group_link).await
    }

    async fn end_event(&self, event_id: i64) -> Result<Event> {
        self.events.end(event_id).await
    }

    async fn add_participant(&self, event_id: i64, user_id: i64) -> Result<bool> {
        self.events.add_participant(event_id, user_id).await
    }

    async fn is_participant(&self, event_id: i64, user_id: i64) -> Result<bool> {
        self.events.is_participant(event_id, user_id).await
    }

    async fn participant_count(&self, event_id: i64) -> Result<i64> {
        self.events.participant_count(event_id).await
    }

    async fn participants(&self, event_id: i64) -> Result<Vec<EventParticipant>> {
        self.events.participants(event_id).await
    }
}
