//! User repository implementation

use chrono::Utc;
use sqlx::PgPool;

use crate::models::user::{NewUserProfile, User};
use crate::utils::errors::{GroupWardenError, Result};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user unless one exists; returns the row and whether it was
    /// inserted. Concurrent first registrations resolve through the primary
    /// key: the loser reads the winner's row.
    pub async fn create_if_absent(
        &self,
        profile: NewUserProfile,
        referral_code: String,
        referred_by: Option<i64>,
    ) -> Result<(User, bool)> {
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, referral_code, referred_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (telegram_id) DO NOTHING
            RETURNING telegram_id, username, first_name, last_name, referral_code, referred_by, created_at
            "#
        )
        .bind(profile.telegram_id)
        .bind(profile.username)
        .bind(profile.first_name)
        .bind(profile.last_name)
        .bind(referral_code)
        .bind(referred_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user) = inserted {
            return Ok((user, true));
        }

        let existing = self
            .find_by_telegram_id(profile.telegram_id)
            .await?
            .ok_or_else(|| {
                GroupWardenError::Conflict(format!(
                    "user {} vanished during upsert",
                    profile.telegram_id
                ))
            })?;
        Ok((existing, false))
    }

    /// Find user by Telegram ID
    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT telegram_id, username, first_name, last_name, referral_code, referred_by, created_at FROM users WHERE telegram_id = $1"
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by referral code
    pub async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT telegram_id, username, first_name, last_name, referral_code, referred_by, created_at FROM users WHERE referral_code = $1"
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Fetch a batch of users by Telegram ID
    pub async fn find_many(&self, telegram_ids: &[i64]) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT telegram_id, username, first_name, last_name, referral_code, referred_by, created_at FROM users WHERE telegram_id = ANY($1)"
        )
        .bind(telegram_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
