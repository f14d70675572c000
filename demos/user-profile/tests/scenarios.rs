//! End-to-end scenarios for the email form and the profile view
//!
//! Each scenario runs against a fresh `Store` and ends by checking that the
//! store was released.

use single_entry_core::{Clock, EffectError, NoEffects, Ticket};
use single_entry_runtime::{
    AnalyticsMiddleware, CrashReportingMiddleware, Incident, Store, StoreError,
};
use single_entry_testing::{
    CollectingAnalytics, CollectingCrashReporter, RecordingExecutor, ScenarioTest,
    ScriptedExecutor, helpers::init_tracing, mocks::FixedClock, test_clock,
};
use std::sync::Arc;
use std::time::Duration;
use user_profile::{
    EmailFormEvent, EmailFormReducer, EmailFormState, Profile, ProfileEffect, ProfileEnvironment,
    ProfileEvent, ProfileReducer, ProfileState,
};

type Recorder = RecordingExecutor<ProfileEffect, ProfileEvent>;

const FIRST: Ticket = Ticket::new(1);

fn john() -> Profile {
    Profile {
        email: "john@example.com".to_string(),
        display_name: None,
    }
}

/// Answers every effect successfully, echoing its ticket
fn echo(effect: ProfileEffect) -> ProfileEvent {
    match effect {
        ProfileEffect::LoadProfile(ticket) => {
            ProfileEvent::NetworkFinishesLoadingProfile(ticket, Ok(john()))
        },
        ProfileEffect::SaveProfile(ticket, profile) => {
            ProfileEvent::NetworkFinishesSavingProfile(ticket, Ok(profile))
        },
    }
}

fn profile_store<X>(executor: X) -> Store<ProfileReducer<FixedClock>, X>
where
    X: single_entry_core::EffectExecutor<ProfileEffect, ProfileEvent> + 'static,
{
    Store::new(
        ProfileState::default(),
        ProfileReducer::new(),
        ProfileEnvironment::new(test_clock()),
        executor,
    )
}

fn email(state: &ProfileState) -> String {
    state.email.clone()
}

#[tokio::test]
async fn scenario_a_email_form_is_synchronous() {
    ScenarioTest::new(|| Store::new(EmailFormState::default(), EmailFormReducer, (), NoEffects))
        .when(EmailFormEvent::UserTypesNewEmail("a@x.com".to_string()))
        .then("email", |s: &EmailFormState| s.email.clone(), "a@x.com".to_string())
        .when(EmailFormEvent::UserTapsChangeEmailButton)
        .then("savedEmail", |s: &EmailFormState| s.saved_email.clone(), "a@x.com".to_string())
        .run()
        .await;
}

#[tokio::test]
async fn scenario_b_profile_load() {
    ScenarioTest::new(|| profile_store(Recorder::new()))
        .when(ProfileEvent::SystemShowsUserProfileView)
        .then("loading", ProfileState::is_loading, true)
        .when(ProfileEvent::NetworkFinishesLoadingProfile(FIRST, Ok(john())))
        .then("email", email, "john@example.com".to_string())
        .then("loading", ProfileState::is_loading, false)
        .run()
        .await;
}

#[tokio::test]
async fn scenario_c_completion_without_intent_is_rejected() {
    ScenarioTest::new(|| profile_store(Recorder::new()))
        .when(ProfileEvent::NetworkFinishesLoadingProfile(FIRST, Ok(john())))
        .then_rejected()
        .then("email", email, String::new())
        .then("loading", ProfileState::is_loading, false)
        .run()
        .await;
}

#[tokio::test]
async fn scenario_d_failed_save_keeps_previous_email() {
    ScenarioTest::new(|| profile_store(Recorder::new()))
        .when(ProfileEvent::SystemShowsUserProfileView)
        .when(ProfileEvent::NetworkFinishesLoadingProfile(FIRST, Ok(john())))
        .then("email", email, "john@example.com".to_string())
        .when(ProfileEvent::UserTypesNewEmail("new@example.com".to_string()))
        .when(ProfileEvent::UserTapsChangeEmailButton)
        .then("loading", ProfileState::is_loading, true)
        .when(ProfileEvent::NetworkFinishesSavingProfile(
            FIRST,
            Err(EffectError::Transport("offline".to_string())),
        ))
        .then("loading", ProfileState::is_loading, false)
        .then("email", email, "john@example.com".to_string())
        .run()
        .await;
}

#[tokio::test]
async fn completion_rejection_is_idempotent() {
    let twice = ProfileEvent::NetworkFinishesSavingProfile(FIRST, Ok(john()));

    ScenarioTest::new(|| profile_store(Recorder::new()))
        .when(twice.clone())
        .then_rejected()
        .then("state", ProfileState::clone, ProfileState::default())
        .when(twice)
        .then_rejected()
        .then("state", ProfileState::clone, ProfileState::default())
        .run()
        .await;
}

#[tokio::test]
async fn in_flight_survives_unrelated_intents() {
    ScenarioTest::new(|| profile_store(Recorder::new()))
        .when(ProfileEvent::SystemShowsUserProfileView)
        .then("load", |s: &ProfileState| s.load.ticket(), Some(FIRST))
        .when(ProfileEvent::UserTypesNewEmail("a".to_string()))
        .then("load", |s: &ProfileState| s.load.ticket(), Some(FIRST))
        .when(ProfileEvent::UserTypesNewEmail("ab".to_string()))
        .when(ProfileEvent::SystemShowsUserProfileView)
        .when(ProfileEvent::UserTapsChangeEmailButton)
        .then("load", |s: &ProfileState| s.load.ticket(), Some(FIRST))
        .then("save", |s: &ProfileState| s.save.is_in_flight(), false)
        .run()
        .await;
}

#[tokio::test]
async fn round_trip_through_executor() {
    init_tracing();
    let executor = ScriptedExecutor::new(echo);

    ScenarioTest::new(|| profile_store(executor))
        .when(ProfileEvent::SystemShowsUserProfileView)
        .settle(Duration::from_secs(1))
        .then("email", email, "john@example.com".to_string())
        .then("loading", ProfileState::is_loading, false)
        .then("syncedAt", |s: &ProfileState| s.last_synced_at, Some(test_clock().now()))
        .run()
        .await;
}

#[tokio::test]
async fn effect_requested_once_per_trigger() -> Result<(), StoreError> {
    let executor = Recorder::new();
    let store = profile_store(executor.clone());

    store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    store.handle(ProfileEvent::SystemShowsUserProfileView).await?;

    let effects = executor.wait_for(1, Duration::from_secs(1)).await;
    assert_eq!(effects, vec![ProfileEffect::LoadProfile(FIRST)]);

    // Give a wrongly spawned second effect the chance to show up
    tokio::task::yield_now().await;
    assert_eq!(executor.len(), 1);
    Ok(())
}

#[tokio::test]
async fn gated_completion_keeps_indicator_set() -> Result<(), StoreError> {
    let (executor, gate) = ScriptedExecutor::new(echo).gated();
    let store = profile_store(executor.clone());

    let mut handle = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    store
        .handle(ProfileEvent::UserTypesNewEmail("typed while loading".to_string()))
        .await?;
    assert!(store.state(ProfileState::is_loading).await);
    assert_eq!(handle.pending(), 1);

    gate.release(1);
    handle.wait_with_timeout(Duration::from_secs(1)).await?;

    let (loading, email) = store.state(|s| (s.is_loading(), s.email.clone())).await;
    assert!(!loading);
    assert_eq!(email, "john@example.com");
    assert_eq!(executor.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn hidden_view_rejects_late_completion() -> Result<(), StoreError> {
    init_tracing();
    let reporter = Arc::new(CollectingCrashReporter::default());
    let (executor, gate) = ScriptedExecutor::new(echo).gated();

    let store = Store::builder(
        ProfileState::default(),
        ProfileReducer::new(),
        ProfileEnvironment::new(test_clock()),
        executor,
    )
    .middleware(CrashReportingMiddleware::new(reporter.clone()))
    .build();

    let mut handle = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    store.handle(ProfileEvent::SystemHidesUserProfileView).await?;

    gate.release(1);
    handle.wait_with_timeout(Duration::from_secs(1)).await?;

    assert_eq!(store.state(|s| s.email.clone()).await, "");
    assert_eq!(
        reporter.incidents(),
        vec![Incident::Handler(
            single_entry_core::HandlerError::unexpected_completion(
                "load",
                "networkFinishesLoadingProfile"
            )
        )]
    );
    Ok(())
}

#[tokio::test]
async fn abandoned_load_does_not_land_on_newer_one() -> Result<(), StoreError> {
    let reporter = Arc::new(CollectingCrashReporter::default());
    // The first load answers with the copy the server had before
    let (executor, gate) = ScriptedExecutor::new(|effect: ProfileEffect| match effect {
        ProfileEffect::LoadProfile(ticket) if ticket == FIRST => {
            ProfileEvent::NetworkFinishesLoadingProfile(
                ticket,
                Ok(Profile {
                    email: "stale@example.com".to_string(),
                    display_name: None,
                }),
            )
        },
        ProfileEffect::LoadProfile(ticket) => ProfileEvent::NetworkFinishesLoadingProfile(
            ticket,
            Ok(Profile {
                email: "fresh@example.com".to_string(),
                display_name: None,
            }),
        ),
        ProfileEffect::SaveProfile(ticket, profile) => {
            ProfileEvent::NetworkFinishesSavingProfile(ticket, Ok(profile))
        },
    })
    .gated();

    let store = Store::builder(
        ProfileState::default(),
        ProfileReducer::new(),
        ProfileEnvironment::new(test_clock()),
        executor,
    )
    .middleware(CrashReportingMiddleware::new(reporter.clone()))
    .build();

    let mut abandoned = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    store.handle(ProfileEvent::SystemHidesUserProfileView).await?;
    let mut current = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    assert!(store.state(ProfileState::is_loading).await);

    gate.release(2);
    abandoned.wait_with_timeout(Duration::from_secs(1)).await?;
    current.wait_with_timeout(Duration::from_secs(1)).await?;

    let (email, loading) = store.state(|s| (s.email.clone(), s.is_loading())).await;
    assert_eq!(email, "fresh@example.com");
    assert!(!loading);
    assert_eq!(
        reporter.incidents(),
        vec![Incident::Handler(
            single_entry_core::HandlerError::unexpected_completion(
                "load",
                "networkFinishesLoadingProfile"
            )
        )]
    );
    Ok(())
}

#[tokio::test]
async fn shutdown_reduces_outstanding_completion() -> Result<(), StoreError> {
    let reporter = Arc::new(CollectingCrashReporter::default());
    let (executor, gate) = ScriptedExecutor::new(echo).gated();
    let store = Store::builder(
        ProfileState::default(),
        ProfileReducer::new(),
        ProfileEnvironment::new(test_clock()),
        executor,
    )
    .middleware(CrashReportingMiddleware::new(reporter.clone()))
    .build();

    store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    let shutdown = tokio::spawn({
        let store = store.clone();
        async move { store.shutdown(Duration::from_secs(2)).await }
    });

    // Wait until callers are refused, then let the load answer
    while store.handle(ProfileEvent::UserTypesNewEmail("typing".to_string())).await.is_ok() {
        tokio::task::yield_now().await;
    }
    gate.release(1);

    let result = shutdown.await.unwrap_or(Err(StoreError::ChannelClosed));
    assert_eq!(result, Ok(()));

    let (email, loading) = store.state(|s| (s.email.clone(), s.is_loading())).await;
    assert_eq!(email, "john@example.com");
    assert!(!loading);
    assert!(reporter.incidents().is_empty());
    Ok(())
}

#[tokio::test]
async fn analytics_and_crash_reports_follow_transitions() -> Result<(), StoreError> {
    let analytics = Arc::new(CollectingAnalytics::default());
    let reporter = Arc::new(CollectingCrashReporter::default());

    let store = Store::builder(
        ProfileState::default(),
        ProfileReducer::new(),
        ProfileEnvironment::new(test_clock()),
        Recorder::new(),
    )
    .middleware(AnalyticsMiddleware::new(analytics.clone(), reporter.clone()))
    .middleware(CrashReportingMiddleware::new(reporter.clone()))
    .build();

    store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    store
        .handle(ProfileEvent::UserTypesNewEmail("pasted\n".to_string()))
        .await?;
    let rejected = store
        .handle(ProfileEvent::NetworkFinishesSavingProfile(FIRST, Ok(john())))
        .await;
    assert!(matches!(rejected, Err(StoreError::Handler(_))));

    // The derivation failure did not block the transition
    assert_eq!(store.state(|s| s.draft_email.clone()).await, "pasted\n");

    assert_eq!(
        analytics.names(),
        vec!["systemShowsUserProfileView", "networkFinishesSavingProfile"]
    );

    let incidents = reporter.incidents();
    assert_eq!(incidents.len(), 2);
    assert!(matches!(incidents[0], Incident::Derivation(_)));
    assert!(matches!(incidents[1], Incident::Handler(_)));
    Ok(())
}
