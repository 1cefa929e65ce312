//! Shared helpers for the integration test suites
//!
//! Every suite runs the full service stack over the in-memory store, so no
//! external infrastructure is needed.

#![allow(dead_code)]

use GroupWarden::config::Settings;
use GroupWarden::models::{NewUserProfile, User};
use GroupWarden::services::ServiceFactory;
use GroupWarden::storage::MemoryStore;

pub type TestFactory = ServiceFactory<MemoryStore>;

/// Build a factory over a fresh in-memory store, returning the store handle
/// so tests can inspect raw rows
pub fn test_factory() -> (TestFactory, MemoryStore) {
    let store = MemoryStore::new();
    let factory = ServiceFactory::new(store.clone(), Settings::default());
    (factory, store)
}

pub fn profile(telegram_id: i64, username: &str) -> NewUserProfile {
    NewUserProfile {
        telegram_id,
        username: Some(username.to_string()),
        first_name: None,
        last_name: None,
    }
}

/// Register a user with no referrer and no event
pub async fn register(factory: &TestFactory, telegram_id: i64, username: &str) -> User {
    factory
        .referral
        .register(profile(telegram_id, username), None, None)
        .await
        .expect("registration failed")
        .user
}
