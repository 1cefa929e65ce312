//! Event and referral-edge repository implementation
//!
//! Referral edges are write-once per (referrer, referred) pair per scope;
//! partial unique indexes make NULL-event (global) its own scope, and
//! `ON CONFLICT DO NOTHING` turns race losers into no-ops.

use chrono::Utc;
use sqlx::PgPool;

use crate::models::event::{CreateEventRequest, Event, EventParticipant, ReferralEdge};
use crate::utils::errors::{GroupWardenError, Result};

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(
        &self,
        host_id: i64,
        event_code: String,
        request: CreateEventRequest,
    ) -> Result<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (event_code, title, description, host_id, group_link, is_active, starts_at, ends_at, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8)
            RETURNING id, event_code, title, description, host_id, group_link, is_active, starts_at, ends_at, created_at, ended_at
            "#
        )
        .bind(event_code)
        .bind(request.title)
        .bind(request.description)
        .bind(host_id)
        .bind(request.group_link)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, event_id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, event_code, title, description, host_id, group_link, is_active, starts_at, ends_at, created_at, ended_at FROM events WHERE id = $1"
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by code
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, event_code, title, description, host_id, group_link, is_active, starts_at, ends_at, created_at, ended_at FROM events WHERE event_code = $1"
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Set the group link for an event
    pub async fn update_group_link(&self, event_id: i64, group_link: String) -> Result<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET group_link = $2
            WHERE id = $1
            RETURNING id, event_code, title, description, host_id, group_link, is_active, starts_at, ends_at, created_at, ended_at
            "#
        )
        .bind(event_id)
        .bind(group_link)
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or(GroupWardenError::EventNotFound { code: event_id.to_string() })
    }

    /// Close an event, freezing its leaderboard window
    pub async fn end(&self, event_id: i64) -> Result<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET is_active = FALSE,
                ended_at = COALESCE(ended_at, $2)
            WHERE id = $1
            RETURNING id, event_code, title, description, host_id, group_link, is_active, starts_at, ends_at, created_at, ended_at
            "#
        )
        .bind(event_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or(GroupWardenError::EventNotFound { code: event_id.to_string() })
    }

    /// Idempotent membership insert
    pub async fn add_participant(&self, event_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_participants (event_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id, user_id) DO NOTHING
            "#
        )
        .bind(event_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check event membership
    pub async fn is_participant(&self, event_id: i64, user_id: i64) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM event_participants WHERE event_id = $1 AND user_id = $2)"
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Count event participants
    pub async fn participant_count(&self, event_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_participants WHERE event_id = $1"
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// List event members, ascending join time
    pub async fn participants(&self, event_id: i64) -> Result<Vec<EventParticipant>> {
        let rows = sqlx::query_as::<_, EventParticipant>(
            "SELECT event_id, user_id, joined_at FROM event_participants WHERE event_id = $1 ORDER BY joined_at, user_id"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Write-once referral edge insert; the unique indexes absorb duplicates
    /// and concurrent losers
    pub async fn insert_edge(
        &self,
        referrer_id: i64,
        referred_id: i64,
        event_id: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO referral_edges (referrer_id, referred_id, event_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#
        )
        .bind(referrer_id)
        .bind(referred_id)
        .bind(event_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every edge across all scopes
    pub async fn edges(&self) -> Result<Vec<ReferralEdge>> {
        let edges = sqlx::query_as::<_, ReferralEdge>(
            "SELECT referrer_id, referred_id, event_id, created_at FROM referral_edges ORDER BY created_at"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    /// Edges scoped to one event
    pub async fn edges_for_event(&self, event_id: i64) -> Result<Vec<ReferralEdge>> {
        let edges = sqlx::query_as::<_, ReferralEdge>(
            "SELECT referrer_id, referred_id, event_id, created_at FROM referral_edges WHERE event_id = $1 ORDER BY created_at"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    /// Distinct users referred by one referrer, across all scopes
    pub async fn count_referrals(&self, referrer_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT referred_id) FROM referral_edges WHERE referrer_id = $1"
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
