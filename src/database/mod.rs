//! Database module
//!
//! This module handles database connections and the PostgreSQL implementation
//! of the storage contract.

pub mod connection;
pub mod repositories;
pub mod service;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool};
pub use repositories::{EventRepository, ModerationRepository, UserRepository};
pub use service::DatabaseService;
