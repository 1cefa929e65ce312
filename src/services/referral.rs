//! Referral service implementation
//!
//! This service owns the attribution graph: user registration with write-once
//! referral edges, two-stage code resolution for `/start` deep links, hosted
//! events with membership, share links and per-user stats.

use tracing::{debug, info, warn};

use crate::config::settings::Settings;
use crate::models::decision::{
    Attribution, EventStats, JoinOutcome, RegisterOutcome, StartOutcome, UserStats,
};
use crate::models::event::{CreateEventRequest, Event};
use crate::models::user::{NewUserProfile, User};
use crate::services::leaderboard::rank_global;
use crate::storage::ReferralStore;
use crate::utils::codes::{
    self, composite_code, deep_link, parse_start_arg, StartArg,
};
use crate::utils::errors::{GroupWardenError, Result};
use crate::utils::logging::log_referral_attribution;

/// Attempts at drawing an unused code before giving up
const CODE_ATTEMPTS: usize = 5;

/// Referral graph service
#[derive(Debug, Clone)]
pub struct ReferralService<S> {
    store: S,
    settings: Settings,
}

impl<S: ReferralStore> ReferralService<S> {
    /// Create a new ReferralService instance
    pub fn new(store: S, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Draw a code unused by both users and events. Referral and event codes
    /// share the `/start` namespace, so uniqueness spans both.
    async fn fresh_code(&self) -> Result<String> {
        for _ in 0..CODE_ATTEMPTS {
            let code = codes::generate_code();
            if self.store.find_user_by_code(&code).await?.is_none()
                && self.store.find_event_by_code(&code).await?.is_none()
            {
                return Ok(code);
            }
        }
        Err(GroupWardenError::Conflict(
            "could not allocate an unused code".to_string(),
        ))
    }

    /// Register a user, attributing them at most once.
    ///
    /// Re-registering an existing user is a no-op returning their existing
    /// code: `referred_by` is immutable after first registration, so no edge
    /// is ever written for a user who already exists. A concurrent-registration
    /// loser therefore resolves to a no-op as well.
    pub async fn register(
        &self,
        profile: NewUserProfile,
        referred_by: Option<i64>,
        event_id: Option<i64>,
    ) -> Result<RegisterOutcome> {
        if referred_by == Some(profile.telegram_id) {
            return Err(GroupWardenError::SelfReferral { user_id: profile.telegram_id });
        }

        if let Some(referrer_id) = referred_by {
            if self.store.find_user(referrer_id).await?.is_none() {
                return Err(GroupWardenError::UserNotFound { user_id: referrer_id });
            }
        }

        let event = match event_id {
            Some(id) => {
                let event = self
                    .store
                    .find_event(id)
                    .await?
                    .ok_or(GroupWardenError::EventNotFound { code: id.to_string() })?;
                if !event.is_active {
                    return Err(GroupWardenError::Validation(format!(
                        "event {} has ended",
                        event.event_code
                    )));
                }
                Some(event)
            }
            None => None,
        };

        let telegram_id = profile.telegram_id;
        let code = self.fresh_code().await?;
        let (user, created) = self
            .store
            .create_user_if_absent(profile, code, referred_by)
            .await?;

        let mut attribution = None;
        if created {
            info!(user_id = telegram_id, referred_by = referred_by, "User registered");
            if let Some(referrer_id) = referred_by {
                let scope = event.as_ref().map(|e| e.id);
                if self.store.insert_edge(referrer_id, telegram_id, scope).await? {
                    log_referral_attribution(referrer_id, telegram_id, scope);
                    attribution = Some(Attribution {
                        referrer_id,
                        referred_id: telegram_id,
                        event_id: scope,
                    });
                }
            }
        } else {
            debug!(user_id = telegram_id, "User already registered, no-op");
        }

        if let Some(event) = &event {
            self.store.add_participant(event.id, telegram_id).await?;
        }

        Ok(RegisterOutcome { user, created, attribution, joined_event: event })
    }

    /// Look up the owner of a personal referral code
    pub async fn resolve_code(&self, code: &str) -> Result<Option<User>> {
        if !codes::is_valid_code(code) {
            return Err(GroupWardenError::Validation(format!("malformed code: {code}")));
        }
        self.store.find_user_by_code(code).await
    }

    /// Resolve a `/start` argument into (referrer, event).
    ///
    /// A bare code resolves as an event code first, then as a personal code.
    /// A composite code attributes only when both halves resolve and the event
    /// is still running; otherwise the whole argument attributes nothing, and
    /// registration proceeds without it.
    async fn resolve_start_context(&self, raw: &str) -> Result<(Option<User>, Option<Event>)> {
        match parse_start_arg(raw)? {
            StartArg::Bare(code) => {
                if let Some(event) = self.store.find_event_by_code(&code).await? {
                    if event.is_active {
                        return Ok((None, Some(event)));
                    }
                    warn!(code = %code, "Start code points at an ended event");
                    return Ok((None, None));
                }
                if let Some(user) = self.store.find_user_by_code(&code).await? {
                    return Ok((Some(user), None));
                }
                warn!(code = %code, "Start code resolved to nothing");
                Ok((None, None))
            }
            StartArg::Composite { referral, event } => {
                let referrer = self.store.find_user_by_code(&referral).await?;
                let event = self.store.find_event_by_code(&event).await?;
                match (referrer, event) {
                    (Some(referrer), Some(event)) if event.is_active => {
                        Ok((Some(referrer), Some(event)))
                    }
                    _ => {
                        warn!(code = %raw, "Composite start code did not fully resolve");
                        Ok((None, None))
                    }
                }
            }
        }
    }

    /// Handle `/start [code]`: register the caller, attributing and joining
    /// according to what the code resolves to
    pub async fn handle_start(
        &self,
        profile: NewUserProfile,
        arg: Option<&str>,
    ) -> Result<StartOutcome> {
        let (referrer, event) = match arg {
            Some(raw) => self.resolve_start_context(raw).await?,
            None => (None, None),
        };

        if let Some(referrer) = &referrer {
            if referrer.telegram_id == profile.telegram_id {
                return Err(GroupWardenError::SelfReferral { user_id: profile.telegram_id });
            }
        }

        let outcome = self
            .register(
                profile,
                referrer.as_ref().map(|u| u.telegram_id),
                event.as_ref().map(|e| e.id),
            )
            .await?;

        Ok(StartOutcome {
            referral_code: outcome.user.referral_code.clone(),
            redirect_group_link: outcome
                .joined_event
                .as_ref()
                .and_then(|e| e.group_link.clone()),
            user: outcome.user,
            created: outcome.created,
            attribution: outcome.attribution,
            joined_event: outcome.joined_event,
        })
    }

    /// Create an event hosted by `host_id`; the host joins immediately
    pub async fn create_event(&self, host_id: i64, request: CreateEventRequest) -> Result<Event> {
        if request.title.trim().is_empty() {
            return Err(GroupWardenError::Validation("event title is required".to_string()));
        }
        if let Some(link) = &request.group_link {
            if !codes::is_valid_group_link(link) {
                return Err(GroupWardenError::Validation(format!("invalid group link: {link}")));
            }
        }
        if let (Some(starts), Some(ends)) = (request.starts_at, request.ends_at) {
            if ends <= starts {
                return Err(GroupWardenError::Validation(
                    "event window must end after it starts".to_string(),
                ));
            }
        }
        if self.store.find_user(host_id).await?.is_none() {
            return Err(GroupWardenError::UserNotFound { user_id: host_id });
        }

        let code = self.fresh_code().await?;
        let event = self.store.insert_event(host_id, code, request).await?;
        self.store.add_participant(event.id, host_id).await?;

        info!(event_id = event.id, event_code = %event.event_code, host_id = host_id, "Event created");
        Ok(event)
    }

    /// Join an event by code. Idempotent.
    pub async fn join_event(&self, user_id: i64, event_code: &str) -> Result<JoinOutcome> {
        let event = self
            .store
            .find_event_by_code(event_code)
            .await?
            .ok_or_else(|| GroupWardenError::EventNotFound { code: event_code.to_string() })?;
        if !event.is_active {
            return Err(GroupWardenError::Validation(format!(
                "event {event_code} has ended"
            )));
        }
        if self.store.find_user(user_id).await?.is_none() {
            return Err(GroupWardenError::UserNotFound { user_id });
        }

        let newly_joined = self.store.add_participant(event.id, user_id).await?;
        if newly_joined {
            info!(event_id = event.id, user_id = user_id, "User joined event");
        }
        Ok(JoinOutcome { event, newly_joined })
    }

    /// Close an event, freezing its leaderboard window. Host only.
    pub async fn end_event(&self, host_id: i64, event_code: &str) -> Result<Event> {
        let event = self
            .store
            .find_event_by_code(event_code)
            .await?
            .ok_or_else(|| GroupWardenError::EventNotFound { code: event_code.to_string() })?;
        if event.host_id != host_id {
            return Err(GroupWardenError::PermissionDenied(
                "only the event host can end it".to_string(),
            ));
        }

        let ended = self.store.end_event(event.id).await?;
        info!(event_id = ended.id, host_id = host_id, "Event ended");
        Ok(ended)
    }

    /// Attach a group link to an event. Host only.
    pub async fn set_group_link(
        &self,
        host_id: i64,
        event_code: &str,
        group_link: &str,
    ) -> Result<Event> {
        if !codes::is_valid_group_link(group_link) {
            return Err(GroupWardenError::Validation(format!(
                "invalid group link: {group_link}"
            )));
        }

        let event = self
            .store
            .find_event_by_code(event_code)
            .await?
            .ok_or_else(|| GroupWardenError::EventNotFound { code: event_code.to_string() })?;
        if event.host_id != host_id {
            return Err(GroupWardenError::PermissionDenied(
                "only the event host can set its group link".to_string(),
            ));
        }

        self.store.update_event_group_link(event.id, group_link.to_string()).await
    }

    /// The user's personal share link
    pub async fn referral_link(&self, user_id: i64) -> Result<String> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(GroupWardenError::UserNotFound { user_id })?;
        Ok(deep_link(&self.settings.referral.bot_username, &user.referral_code))
    }

    /// The user's share link scoped to an event: resolving it attributes new
    /// joiners to both this user and the event. Joins the user into the event
    /// first (idempotent), so shared links always belong to participants.
    pub async fn event_referral_link(&self, user_id: i64, event_code: &str) -> Result<String> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(GroupWardenError::UserNotFound { user_id })?;
        let join = self.join_event(user_id, event_code).await?;

        Ok(deep_link(
            &self.settings.referral.bot_username,
            &composite_code(&user.referral_code, &join.event.event_code),
        ))
    }

    /// Membership and referral aggregates for an event's stats screen
    pub async fn event_stats(&self, event_code: &str) -> Result<EventStats> {
        let event = self
            .store
            .find_event_by_code(event_code)
            .await?
            .ok_or_else(|| GroupWardenError::EventNotFound { code: event_code.to_string() })?;

        let participant_count = self.store.participant_count(event.id).await?;
        let participants = self.store.participants(event.id).await?;
        let referral_count = self.store.edges_for_event(event.id).await?.len() as i64;

        Ok(EventStats { event, participant_count, referral_count, participants })
    }

    /// Referral statistics for the stats screen
    pub async fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(GroupWardenError::UserNotFound { user_id })?;
        let total_referrals = self.store.count_referrals(user_id).await?;

        let global_rank = if total_referrals > 0 {
            let ranked = rank_global(self.store.edges_global().await?);
            ranked
                .iter()
                .position(|r| r.referrer_id == user_id)
                .map(|idx| idx + 1)
        } else {
            None
        };

        Ok(UserStats {
            user_id,
            referral_code: user.referral_code,
            total_referrals,
            global_rank,
        })
    }
}
