//! Error handling for GroupWarden
//!
//! This module defines the main error types used throughout the engine
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for GroupWarden operations
#[derive(Error, Debug)]
pub enum GroupWardenError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Self-referral attempt by user {user_id}")]
    SelfReferral { user_id: i64 },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Event not found: {code}")]
    EventNotFound { code: String },

    #[error("Conflicting concurrent write: {0}")]
    Conflict(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Result type alias for GroupWarden operations
pub type Result<T> = std::result::Result<T, GroupWardenError>;

impl GroupWardenError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            GroupWardenError::Database(_) => false,
            GroupWardenError::Migration(_) => false,
            GroupWardenError::Config(_) => false,
            GroupWardenError::Validation(_) => false,
            GroupWardenError::SelfReferral { .. } => false,
            GroupWardenError::UserNotFound { .. } => false,
            GroupWardenError::EventNotFound { .. } => false,
            GroupWardenError::Conflict(_) => true,
            GroupWardenError::PermissionDenied(_) => false,
            GroupWardenError::Serialization(_) => false,
            GroupWardenError::Io(_) => true,
            GroupWardenError::StoreUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GroupWardenError::Database(_) => ErrorSeverity::Critical,
            GroupWardenError::Migration(_) => ErrorSeverity::Critical,
            GroupWardenError::Config(_) => ErrorSeverity::Critical,
            GroupWardenError::StoreUnavailable(_) => ErrorSeverity::Critical,
            GroupWardenError::PermissionDenied(_) => ErrorSeverity::Warning,
            GroupWardenError::Conflict(_) => ErrorSeverity::Warning,
            GroupWardenError::Validation(_) => ErrorSeverity::Info,
            GroupWardenError::SelfReferral { .. } => ErrorSeverity::Info,
            GroupWardenError::UserNotFound { .. } => ErrorSeverity::Info,
            GroupWardenError::EventNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
