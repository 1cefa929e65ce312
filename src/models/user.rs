//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display identity for leaderboards and stats screens
    pub fn display_name(&self) -> String {
        if let Some(username) = &self.username {
            return format!("@{username}");
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.telegram_id.to_string(),
        }
    }
}

/// Identity fields the platform adapter hands over on first contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: Option<&str>, first: Option<&str>, last: Option<&str>) -> User {
        User {
            telegram_id: 7,
            username: username.map(String::from),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            referral_code: "ABCD2345".to_string(),
            referred_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_prefers_username() {
        assert_eq!(user(Some("dancer"), Some("Ann"), None).display_name(), "@dancer");
        assert_eq!(user(None, Some("Ann"), Some("Lee")).display_name(), "Ann Lee");
        assert_eq!(user(None, Some("Ann"), None).display_name(), "Ann");
        assert_eq!(user(None, None, None).display_name(), "7");
    }
}
