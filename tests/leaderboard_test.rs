//! Leaderboard integration tests

mod helpers;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use helpers::*;

use GroupWarden::models::{CreateEventRequest, Decision, InboundEvent, LeaderboardScope};
use GroupWarden::storage::ReferralStore;
use GroupWarden::utils::codes::composite_code;
use GroupWarden::GroupWardenError;

/// Register `count` users referred by `referrer`, ids starting at `base_id`
async fn refer_users(factory: &TestFactory, referrer_code: &str, base_id: i64, count: i64) {
    for i in 0..count {
        factory
            .referral
            .handle_start(profile(base_id + i, &format!("ref{}", base_id + i)), Some(referrer_code))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_global_ranking_orders_by_count_then_earliest() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let bob = register(&factory, 2, "bob").await;
    let carol = register(&factory, 3, "carol").await;

    // Alice refers first and ties Bob on count; Carol trails
    refer_users(&factory, &alice.referral_code, 100, 2).await;
    refer_users(&factory, &bob.referral_code, 200, 2).await;
    refer_users(&factory, &carol.referral_code, 300, 1).await;

    let rows = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Global, 10)
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].user_id, 1);
    assert_eq!(rows[0].display_name, "@alice");
    assert_eq!(rows[0].referral_count, 2);
    // Same count, but Alice's first referral predates Bob's
    assert_eq!(rows[1].user_id, 2);
    assert_eq!(rows[2].user_id, 3);
    assert_eq!(rows[2].referral_count, 1);
}

#[tokio::test]
async fn test_ranking_is_deterministic() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let bob = register(&factory, 2, "bob").await;
    refer_users(&factory, &alice.referral_code, 100, 3).await;
    refer_users(&factory, &bob.referral_code, 200, 3).await;

    let first = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Global, 10)
        .await
        .unwrap();
    for _ in 0..5 {
        let again = factory
            .leaderboard
            .leaderboard(LeaderboardScope::Global, 10)
            .await
            .unwrap();
        let ids: Vec<i64> = again.iter().map(|r| r.user_id).collect();
        let expected: Vec<i64> = first.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, expected);
    }
}

#[tokio::test]
async fn test_limit_is_validated_and_applied() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let bob = register(&factory, 2, "bob").await;
    refer_users(&factory, &alice.referral_code, 100, 2).await;
    refer_users(&factory, &bob.referral_code, 200, 1).await;

    for bad_limit in [0, -5, 101] {
        let err = factory
            .leaderboard
            .leaderboard(LeaderboardScope::Global, bad_limit)
            .await
            .unwrap_err();
        assert_matches!(err, GroupWardenError::Validation(_));
    }

    let rows = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Global, 1)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, 1);
}

#[tokio::test]
async fn test_event_scope_counts_only_event_edges() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let bob = register(&factory, 2, "bob").await;
    let event = factory
        .referral
        .create_event(1, CreateEventRequest { title: "Contest".to_string(), ..Default::default() })
        .await
        .unwrap();

    // Two event-scoped referrals for Alice, one global-only for Bob
    let alice_event_code = composite_code(&alice.referral_code, &event.event_code);
    refer_users(&factory, &alice_event_code, 100, 2).await;
    refer_users(&factory, &bob.referral_code, 200, 1).await;

    let rows = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Event(event.id), 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "global-only referrals stay off the event board");
    assert_eq!(rows[0].user_id, 1);
    assert_eq!(rows[0].referral_count, 2);

    // The global board sees everything once
    let rows = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Global, 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].user_id, 1);
    assert_eq!(rows[1].user_id, 2);
}

#[tokio::test]
async fn test_event_window_excludes_edges_before_start() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;

    // The event's explicit window only opens an hour from now
    let event = factory
        .referral
        .create_event(1, CreateEventRequest {
            title: "Contest".to_string(),
            starts_at: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();

    let code = composite_code(&alice.referral_code, &event.event_code);
    refer_users(&factory, &code, 100, 1).await;

    let rows = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Event(event.id), 10)
        .await
        .unwrap();
    assert!(rows.is_empty(), "edges before the window start do not count");
}

#[tokio::test]
async fn test_event_window_freezes_at_end() {
    let (factory, store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let event = factory
        .referral
        .create_event(1, CreateEventRequest { title: "Contest".to_string(), ..Default::default() })
        .await
        .unwrap();

    let code = composite_code(&alice.referral_code, &event.event_code);
    refer_users(&factory, &code, 100, 1).await;

    factory.referral.end_event(1, &event.event_code).await.unwrap();

    // An edge recorded after the freeze never counts for the event
    store.insert_edge(1, 999, Some(event.id)).await.unwrap();

    let rows = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Event(event.id), 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].referral_count, 1);
}

#[tokio::test]
async fn test_unknown_event_scope_errors() {
    let (factory, _store) = test_factory();

    let err = factory
        .leaderboard
        .leaderboard(LeaderboardScope::Event(12345), 10)
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::EventNotFound { .. });
}

#[tokio::test]
async fn test_leaderboard_dispatch_returns_rows() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    refer_users(&factory, &alice.referral_code, 100, 2).await;

    let decisions = factory
        .handle_event(InboundEvent::LeaderboardRequested {
            scope: LeaderboardScope::Global,
            limit: 10,
        })
        .await
        .unwrap();
    assert_matches!(
        decisions.as_slice(),
        [Decision::LeaderboardRows { scope: LeaderboardScope::Global, rows }]
            if rows.len() == 1 && rows[0].user_id == 1 && rows[0].referral_count == 2
    );
}
