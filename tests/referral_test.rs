//! Referral graph integration tests

mod helpers;

use assert_matches::assert_matches;
use helpers::*;

use GroupWarden::models::{CreateEventRequest, Decision, InboundEvent};
use GroupWarden::storage::ReferralStore;
use GroupWarden::utils::codes::{composite_code, CODE_LENGTH};
use GroupWarden::GroupWardenError;

#[tokio::test]
async fn test_registration_issues_code_and_is_idempotent() {
    let (factory, store) = test_factory();

    let first = factory
        .referral
        .register(profile(1, "alice"), None, None)
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.user.referral_code.len(), CODE_LENGTH);
    assert!(first.attribution.is_none());

    // Re-registering is a no-op returning the same code
    let second = factory
        .referral
        .register(profile(1, "alice"), None, None)
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.user.referral_code, first.user.referral_code);

    assert!(store.edges_global().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_referred_registration_creates_exactly_one_edge() {
    let (factory, store) = test_factory();
    let referrer = register(&factory, 1, "alice").await;

    let outcome = factory
        .referral
        .register(profile(2, "bob"), Some(referrer.telegram_id), None)
        .await
        .unwrap();
    let attribution = outcome.attribution.expect("first registration attributes");
    assert_eq!(attribution.referrer_id, 1);
    assert_eq!(attribution.referred_id, 2);
    assert_eq!(attribution.event_id, None);

    // The same call again: user exists, no second edge
    let outcome = factory
        .referral
        .register(profile(2, "bob"), Some(referrer.telegram_id), None)
        .await
        .unwrap();
    assert!(!outcome.created);
    assert!(outcome.attribution.is_none());

    assert_eq!(store.edges_global().await.unwrap().len(), 1);
    assert_eq!(store.count_referrals(1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_self_referral_is_rejected_without_state_change() {
    let (factory, store) = test_factory();
    let user = register(&factory, 1, "alice").await;

    let err = factory
        .referral
        .register(profile(1, "alice"), Some(1), None)
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::SelfReferral { user_id: 1 });

    // Via /start with the user's own code: same rejection
    let err = factory
        .referral
        .handle_start(profile(1, "alice"), Some(&user.referral_code))
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::SelfReferral { user_id: 1 });

    assert!(store.edges_global().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bare_personal_code_attributes_globally() {
    let (factory, _store) = test_factory();
    let referrer = register(&factory, 1, "alice").await;

    let outcome = factory
        .referral
        .handle_start(profile(2, "bob"), Some(&referrer.referral_code))
        .await
        .unwrap();
    assert!(outcome.created);
    let attribution = outcome.attribution.expect("personal code attributes");
    assert_eq!(attribution.referrer_id, 1);
    assert_eq!(attribution.event_id, None);
    assert!(outcome.joined_event.is_none());
    assert_eq!(outcome.user.referred_by, Some(1));
}

#[tokio::test]
async fn test_composite_code_attributes_into_event() {
    let (factory, store) = test_factory();
    let referrer = register(&factory, 1, "alice").await;
    let event = factory
        .referral
        .create_event(1, CreateEventRequest {
            title: "Launch party".to_string(),
            group_link: Some("https://t.me/launch_party".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let code = composite_code(&referrer.referral_code, &event.event_code);
    let outcome = factory
        .referral
        .handle_start(profile(2, "bob"), Some(&code))
        .await
        .unwrap();

    let attribution = outcome.attribution.expect("composite code attributes");
    assert_eq!(attribution.referrer_id, 1);
    assert_eq!(attribution.referred_id, 2);
    assert_eq!(attribution.event_id, Some(event.id));

    // Membership was created and the adapter is told where to send them
    let joined = outcome.joined_event.expect("composite code joins the event");
    assert_eq!(joined.id, event.id);
    assert!(store.is_participant(event.id, 2).await.unwrap());
    assert_eq!(outcome.redirect_group_link.as_deref(), Some("https://t.me/launch_party"));

    let edges = store.edges_for_event(event.id).await.unwrap();
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn test_bare_event_code_joins_without_attribution() {
    let (factory, store) = test_factory();
    register(&factory, 1, "alice").await;
    let event = factory
        .referral
        .create_event(1, CreateEventRequest { title: "Meetup".to_string(), ..Default::default() })
        .await
        .unwrap();

    let outcome = factory
        .referral
        .handle_start(profile(2, "bob"), Some(&event.event_code))
        .await
        .unwrap();
    assert!(outcome.attribution.is_none());
    assert_eq!(outcome.joined_event.unwrap().id, event.id);
    assert!(store.is_participant(event.id, 2).await.unwrap());
}

#[tokio::test]
async fn test_unknown_code_still_registers_without_attribution() {
    let (factory, _store) = test_factory();

    let outcome = factory
        .referral
        .handle_start(profile(2, "bob"), Some("ZZZZ9999"))
        .await
        .unwrap();
    assert!(outcome.created);
    assert!(outcome.attribution.is_none());
    assert!(outcome.joined_event.is_none());

    // Direct lookups are strict where the start flow is lenient
    let err = factory.referral.join_event(2, "ZZZZ9999").await.unwrap_err();
    assert_matches!(err, GroupWardenError::EventNotFound { .. });
}

#[tokio::test]
async fn test_malformed_start_argument_is_rejected() {
    let (factory, _store) = test_factory();

    let err = factory
        .referral
        .handle_start(profile(2, "bob"), Some("not a code!"))
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::Validation(_));
}

#[tokio::test]
async fn test_event_lifecycle() {
    let (factory, store) = test_factory();
    register(&factory, 1, "alice").await;
    register(&factory, 2, "bob").await;

    let event = factory
        .referral
        .create_event(1, CreateEventRequest { title: "Contest".to_string(), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(event.event_code.len(), CODE_LENGTH);
    assert!(event.is_active);
    // The host joined their own event
    assert!(store.is_participant(event.id, 1).await.unwrap());

    let join = factory.referral.join_event(2, &event.event_code).await.unwrap();
    assert!(join.newly_joined);
    let join = factory.referral.join_event(2, &event.event_code).await.unwrap();
    assert!(!join.newly_joined);
    assert_eq!(store.participant_count(event.id).await.unwrap(), 2);

    // Only the host can end it
    let err = factory.referral.end_event(2, &event.event_code).await.unwrap_err();
    assert_matches!(err, GroupWardenError::PermissionDenied(_));

    let ended = factory.referral.end_event(1, &event.event_code).await.unwrap();
    assert!(!ended.is_active);
    assert!(ended.ended_at.is_some());

    // A frozen contest gains no members
    let err = factory.referral.join_event(2, &event.event_code).await.unwrap_err();
    assert_matches!(err, GroupWardenError::Validation(_));
}

#[tokio::test]
async fn test_event_creation_validation() {
    let (factory, _store) = test_factory();
    register(&factory, 1, "alice").await;

    let err = factory
        .referral
        .create_event(1, CreateEventRequest { title: "  ".to_string(), ..Default::default() })
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::Validation(_));

    let err = factory
        .referral
        .create_event(1, CreateEventRequest {
            title: "Party".to_string(),
            group_link: Some("https://example.com/nope".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::Validation(_));

    // Unregistered hosts cannot create events
    let err = factory
        .referral
        .create_event(99, CreateEventRequest { title: "Party".to_string(), ..Default::default() })
        .await
        .unwrap_err();
    assert_matches!(err, GroupWardenError::UserNotFound { user_id: 99 });
}

#[tokio::test]
async fn test_event_referral_link_round_trip() {
    let (factory, _store) = test_factory();
    register(&factory, 1, "alice").await;
    let referrer = register(&factory, 2, "bob").await;
    let event = factory
        .referral
        .create_event(1, CreateEventRequest { title: "Contest".to_string(), ..Default::default() })
        .await
        .unwrap();

    // Bob was not a participant yet; asking for his event link joins him
    let link = factory.referral.event_referral_link(2, &event.event_code).await.unwrap();
    let expected_code = composite_code(&referrer.referral_code, &event.event_code);
    assert_eq!(link, format!("https://t.me/GroupWardenBot?start={expected_code}"));

    // Resolving the shared code attributes the new joiner to Bob and the event
    let outcome = factory
        .referral
        .handle_start(profile(3, "carol"), Some(&expected_code))
        .await
        .unwrap();
    let attribution = outcome.attribution.unwrap();
    assert_eq!(attribution.referrer_id, 2);
    assert_eq!(attribution.event_id, Some(event.id));
}

#[tokio::test]
async fn test_start_dispatch_emits_attribution_decision() {
    let (factory, _store) = test_factory();
    let referrer = register(&factory, 1, "alice").await;

    let decisions = factory
        .handle_event(InboundEvent::StartCommand {
            profile: profile(2, "bob"),
            arg: Some(referrer.referral_code.clone()),
        })
        .await
        .unwrap();
    assert_matches!(
        decisions.as_slice(),
        [Decision::ReferralAttributed { referrer_id: 1, referred_id: 2, event_id: None }]
    );

    // A plain /start with no argument decides nothing
    let decisions = factory
        .handle_event(InboundEvent::StartCommand { profile: profile(3, "carol"), arg: None })
        .await
        .unwrap();
    assert!(decisions.is_empty());
}

#[tokio::test]
async fn test_create_event_dispatch() {
    let (factory, _store) = test_factory();
    register(&factory, 1, "alice").await;

    let decisions = factory
        .handle_event(InboundEvent::CreateEventRequested {
            host_id: 1,
            title: "Contest".to_string(),
            description: Some("Bring friends".to_string()),
            group_link: None,
        })
        .await
        .unwrap();
    assert_matches!(
        decisions.as_slice(),
        [Decision::EventCreated { host_id: 1, event_code, .. }] if event_code.len() == CODE_LENGTH
    );
}

#[tokio::test]
async fn test_user_stats_reports_rank() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let bob = register(&factory, 2, "bob").await;

    // Alice refers two users, Bob one
    for (id, name, code) in [(10, "u10", &alice.referral_code), (11, "u11", &alice.referral_code), (12, "u12", &bob.referral_code)] {
        factory
            .referral
            .handle_start(profile(id, name), Some(code))
            .await
            .unwrap();
    }

    let stats = factory.referral.user_stats(1).await.unwrap();
    assert_eq!(stats.total_referrals, 2);
    assert_eq!(stats.global_rank, Some(1));

    let stats = factory.referral.user_stats(2).await.unwrap();
    assert_eq!(stats.total_referrals, 1);
    assert_eq!(stats.global_rank, Some(2));

    // No referrals, no rank
    let stats = factory.referral.user_stats(10).await.unwrap();
    assert_eq!(stats.total_referrals, 0);
    assert_eq!(stats.global_rank, None);
}

#[tokio::test]
async fn test_event_stats_aggregates() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;
    let event = factory
        .referral
        .create_event(1, CreateEventRequest { title: "Contest".to_string(), ..Default::default() })
        .await
        .unwrap();

    // Two referred joiners plus the host
    let code = composite_code(&alice.referral_code, &event.event_code);
    for (id, name) in [(10, "u10"), (11, "u11")] {
        factory.referral.handle_start(profile(id, name), Some(&code)).await.unwrap();
    }

    let stats = factory.referral.event_stats(&event.event_code).await.unwrap();
    assert_eq!(stats.event.id, event.id);
    assert_eq!(stats.participant_count, 3);
    assert_eq!(stats.referral_count, 2);
    assert_eq!(stats.participants.len(), 3);
    assert_eq!(stats.participants[0].user_id, 1, "host joined first");

    let err = factory.referral.event_stats("ZZZZ9999").await.unwrap_err();
    assert_matches!(err, GroupWardenError::EventNotFound { .. });
}

#[tokio::test]
async fn test_resolve_code_lookup() {
    let (factory, _store) = test_factory();
    let alice = register(&factory, 1, "alice").await;

    let resolved = factory.referral.resolve_code(&alice.referral_code).await.unwrap();
    assert_eq!(resolved.unwrap().telegram_id, 1);

    assert!(factory.referral.resolve_code("ZZZZ9999").await.unwrap().is_none());
    assert_matches!(
        factory.referral.resolve_code("bad code").await.unwrap_err(),
        GroupWardenError::Validation(_)
    );
}
