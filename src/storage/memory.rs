//! In-memory store implementation
//!
//! A mutex-guarded implementation of the persistence contract. Backs the test
//! suite and single-process embeddings that can afford to lose state on
//! restart. Critical sections are short and never held across an await point,
//! which is what makes the counter upserts atomic.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::models::event::{CreateEventRequest, Event, EventParticipant, ReferralEdge};
use crate::models::moderation::{ChatModerationSettings, Strike, Warning};
use crate::models::user::{NewUserProfile, User};
use crate::storage::{ModerationStore, ReferralStore};
use crate::utils::errors::{GroupWardenError, Result};

#[derive(Debug, Default)]
struct Inner {
    settings: HashMap<i64, ChatModerationSettings>,
    warnings: HashMap<(i64, i64), Warning>,
    strikes: HashMap<(i64, i64), Strike>,
    users: HashMap<i64, User>,
    users_by_code: HashMap<String, i64>,
    events: HashMap<i64, Event>,
    events_by_code: HashMap<String, i64>,
    participants: HashMap<(i64, i64), chrono::DateTime<Utc>>,
    edges: Vec<ReferralEdge>,
    edge_keys: HashSet<(i64, i64, Option<i64>)>,
    next_event_id: i64,
}

/// Process-local store satisfying the full engine contract
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a writer panicked mid-update; propagating the
        // panic is the only sound option for counter state.
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn get_settings(&self, chat_id: i64) -> Result<Option<ChatModerationSettings>> {
        Ok(self.lock().settings.get(&chat_id).cloned())
    }

    async fn upsert_settings(
        &self,
        mut settings: ChatModerationSettings,
    ) -> Result<ChatModerationSettings> {
        let mut inner = self.lock();
        settings.updated_at = Utc::now();
        if let Some(existing) = inner.settings.get(&settings.chat_id) {
            settings.created_at = existing.created_at;
        }
        inner.settings.insert(settings.chat_id, settings.clone());
        Ok(settings)
    }

    async fn increment_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<Warning> {
        let mut inner = self.lock();
        let entry = inner.warnings.entry((chat_id, user_id)).or_insert_with(|| Warning {
            chat_id,
            user_id,
            count: 0,
            last_reason: None,
            updated_at: Utc::now(),
        });
        entry.count += 1;
        if reason.is_some() {
            entry.last_reason = reason;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn get_warning(&self, chat_id: i64, user_id: i64) -> Result<Option<Warning>> {
        Ok(self.lock().warnings.get(&(chat_id, user_id)).cloned())
    }

    async fn clear_warnings(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.lock().warnings.remove(&(chat_id, user_id));
        Ok(())
    }

    async fn increment_strike(&self, chat_id: i64, user_id: i64) -> Result<Strike> {
        let mut inner = self.lock();
        let entry = inner.strikes.entry((chat_id, user_id)).or_insert_with(|| Strike {
            chat_id,
            user_id,
            count: 0,
            updated_at: Utc::now(),
        });
        entry.count += 1;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn get_strike(&self, chat_id: i64, user_id: i64) -> Result<Option<Strike>> {
        Ok(self.lock().strikes.get(&(chat_id, user_id)).cloned())
    }

    async fn clear_strikes(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.lock().strikes.remove(&(chat_id, user_id));
        Ok(())
    }
}

#[async_trait]
impl ReferralStore for MemoryStore {
    async fn create_user_if_absent(
        &self,
        profile: NewUserProfile,
        referral_code: String,
        referred_by: Option<i64>,
    ) -> Result<(User, bool)> {
        let mut inner = self.lock();
        if let Some(existing) = inner.users.get(&profile.telegram_id) {
            return Ok((existing.clone(), false));
        }
        if inner.users_by_code.contains_key(&referral_code) {
            return Err(GroupWardenError::Conflict(format!(
                "referral code already taken: {referral_code}"
            )));
        }

        let user = User {
            telegram_id: profile.telegram_id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            referral_code: referral_code.clone(),
            referred_by,
            created_at: Utc::now(),
        };
        inner.users.insert(user.telegram_id, user.clone());
        inner.users_by_code.insert(referral_code, user.telegram_id);
        Ok((user, true))
    }

    async fn find_user(&self, telegram_id: i64) -> Result<Option<User>> {
        Ok(self.lock().users.get(&telegram_id).cloned())
    }

    async fn find_user_by_code(&self, code: &str) -> Result<Option<User>> {
        let inner = self.lock();
        Ok(inner
            .users_by_code
            .get(code)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_users(&self, telegram_ids: &[i64]) -> Result<Vec<User>> {
        let inner = self.lock();
        Ok(telegram_ids
            .iter()
            .filter_map(|id| inner.users.get(id))
            .cloned()
            .collect())
    }

    async fn insert_edge(
        &self,
        referrer_id: i64,
        referred_id: i64,
        event_id: Option<i64>,
    ) -> Result<bool> {
        let mut inner = self.lock();
        if !inner.edge_keys.insert((referrer_id, referred_id, event_id)) {
            return Ok(false);
        }
        inner.edges.push(ReferralEdge {
            referrer_id,
            referred_id,
            event_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn edges_global(&self) -> Result<Vec<ReferralEdge>> {
        Ok(self.lock().edges.clone())
    }

    async fn edges_for_event(&self, event_id: i64) -> Result<Vec<ReferralEdge>> {
        Ok(self
            .lock()
            .edges
            .iter()
            .filter(|e| e.event_id == Some(event_id))
            .cloned()
            .collect())
    }

    async fn count_referrals(&self, referrer_id: i64) -> Result<i64> {
        let inner = self.lock();
        let distinct: HashSet<i64> = inner
            .edges
            .iter()
            .filter(|e| e.referrer_id == referrer_id)
            .map(|e| e.referred_id)
            .collect();
        Ok(distinct.len() as i64)
    }

    async fn insert_event(
        &self,
        host_id: i64,
        event_code: String,
        request: CreateEventRequest,
    ) -> Result<Event> {
        let mut inner = self.lock();
        if inner.events_by_code.contains_key(&event_code) {
            return Err(GroupWardenError::Conflict(format!(
                "event code already taken: {event_code}"
            )));
        }

        inner.next_event_id += 1;
        let event = Event {
            id: inner.next_event_id,
            event_code: event_code.clone(),
            title: request.title,
            description: request.description,
            host_id,
            group_link: request.group_link,
            is_active: true,
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            created_at: Utc::now(),
            ended_at: None,
        };
        inner.events.insert(event.id, event.clone());
        inner.events_by_code.insert(event_code, event.id);
        Ok(event)
    }

    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        Ok(self.lock().events.get(&event_id).cloned())
    }

    async fn find_event_by_code(&self, code: &str) -> Result<Option<Event>> {
        let inner = self.lock();
        Ok(inner
            .events_by_code
            .get(code)
            .and_then(|id| inner.events.get(id))
            .cloned())
    }

    async fn update_event_group_link(&self, event_id: i64, group_link: String) -> Result<Event> {
        let mut inner = self.lock();
        let event = inner
            .events
            .get_mut(&event_id)
            .ok_or(GroupWardenError::EventNotFound { code: event_id.to_string() })?;
        event.group_link = Some(group_link);
        Ok(event.clone())
    }

    async fn end_event(&self, event_id: i64) -> Result<Event> {
        let mut inner = self.lock();
        let event = inner
            .events
            .get_mut(&event_id)
            .ok_or(GroupWardenError::EventNotFound { code: event_id.to_string() })?;
        if event.is_active {
            event.is_active = false;
            event.ended_at = Some(Utc::now());
        }
        Ok(event.clone())
    }

    async fn add_participant(&self, event_id: i64, user_id: i64) -> Result<bool> {
        let mut inner = self.lock();
        if inner.participants.contains_key(&(event_id, user_id)) {
            return Ok(false);
        }
        inner.participants.insert((event_id, user_id), Utc::now());
        Ok(true)
    }

    async fn is_participant(&self, event_id: i64, user_id: i64) -> Result<bool> {
        Ok(self.lock().participants.contains_key(&(event_id, user_id)))
    }

    async fn participant_count(&self, event_id: i64) -> Result<i64> {
        Ok(self
            .lock()
            .participants
            .keys()
            .filter(|(e, _)| *e == event_id)
            .count() as i64)
    }

    async fn participants(&self, event_id: i64) -> Result<Vec<EventParticipant>> {
        let inner = self.lock();
        let mut rows: Vec<EventParticipant> = inner
            .participants
            .iter()
            .filter(|((e, _), _)| *e == event_id)
            .map(|((e, u), joined_at)| EventParticipant {
                event_id: *e,
                user_id: *u,
                joined_at: *joined_at,
            })
            .collect();
        rows.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }
}
