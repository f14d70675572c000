//! User profile example binary
//!
//! Wires the production collaborators (system clock, profile API, logger,
//! analytics and crash reporting) and walks both views through a session.

use anyhow::Context;
use single_entry_core::{NoEffects, SystemClock};
use single_entry_runtime::{
    AnalyticsMiddleware, AnalyticsSink, CrashReporter, CrashReportingMiddleware, Logger,
    LoggingAnalytics, LoggingCrashReporter, Store, StoreError, TracingMiddleware, TracingSink,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_profile::{
    EmailFormEvent, EmailFormReducer, EmailFormState, HttpProfileApi, InMemoryProfileApi, Profile,
    ProfileApi, ProfileApiConfig, ProfileEnvironment, ProfileEvent, ProfileExecutor,
    ProfileReducer, ProfileState,
};

const EFFECT_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_profile=debug,single_entry_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProfileApiConfig::from_env().context("reading profile API configuration")?;
    let api: Arc<dyn ProfileApi> = match &config.base_url {
        Some(url) => {
            tracing::info!(url = %url, timeout = ?config.timeout, "Using HTTP profile API");
            Arc::new(HttpProfileApi::new(url.clone(), config.timeout)?)
        },
        None => {
            tracing::info!("PROFILE_API_URL not set, using in-memory profile API");
            Arc::new(
                InMemoryProfileApi::new(Profile {
                    email: "john@example.com".to_string(),
                    display_name: Some("John".to_string()),
                })
                .with_latency(Duration::from_millis(200)),
            )
        },
    };

    let logger = Logger::new().with_sink(TracingSink);
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(LoggingAnalytics::new(logger.clone()));
    let reporter: Arc<dyn CrashReporter> = Arc::new(LoggingCrashReporter::new(logger.clone()));

    println!("=== Email form (synchronous) ===\n");

    let form = Store::builder(EmailFormState::default(), EmailFormReducer, (), NoEffects)
        .middleware(TracingMiddleware)
        .middleware(AnalyticsMiddleware::new(Arc::clone(&analytics), Arc::clone(&reporter)))
        .build();

    form.handle(EmailFormEvent::UserTypesNewEmail("a@x.com".to_string())).await?;
    form.handle(EmailFormEvent::UserTapsChangeEmailButton).await?;
    let saved = form.state(|s| s.saved_email.clone()).await;
    println!("Saved email: {saved}");

    println!("\n=== Profile (effectful) ===\n");

    let store = Store::builder(
        ProfileState::default(),
        ProfileReducer::new(),
        ProfileEnvironment::new(SystemClock),
        ProfileExecutor::new(api),
    )
    .middleware(TracingMiddleware)
    .middleware(AnalyticsMiddleware::new(analytics, Arc::clone(&reporter)))
    .middleware(CrashReportingMiddleware::new(reporter))
    .build();

    println!(">>> SystemShowsUserProfileView");
    let mut handle = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    println!("Loading: {}", store.state(ProfileState::is_loading).await);
    handle.wait_with_timeout(EFFECT_TIMEOUT).await?;
    print_profile(&store).await;

    println!("\n>>> UserTypesNewEmail + UserTapsChangeEmailButton");
    store
        .handle(ProfileEvent::UserTypesNewEmail("johnny@example.com".to_string()))
        .await?;
    let mut handle = store.handle(ProfileEvent::UserTapsChangeEmailButton).await?;
    handle.wait_with_timeout(EFFECT_TIMEOUT).await?;
    print_profile(&store).await;

    println!("\n>>> Saving an invalid email");
    store
        .handle(ProfileEvent::UserTypesNewEmail("johnny".to_string()))
        .await?;
    let mut handle = store.handle(ProfileEvent::UserTapsChangeEmailButton).await?;
    handle.wait_with_timeout(EFFECT_TIMEOUT).await?;
    print_profile(&store).await;

    println!("\n>>> A completion nobody asked for");
    match store
        .handle(ProfileEvent::NetworkFinishesLoadingProfile(
            single_entry_core::Ticket::new(1),
            Err(single_entry_core::EffectError::Transport("replayed".to_string())),
        ))
        .await
    {
        Err(StoreError::Handler(error)) => println!("Rejected: {error}"),
        Err(other) => return Err(other.into()),
        Ok(_) => println!("Unexpectedly accepted"),
    }

    store.handle(ProfileEvent::SystemHidesUserProfileView).await?;
    store.shutdown_default().await?;
    form.shutdown_default().await?;

    println!("\n=== Session complete ===");
    Ok(())
}

async fn print_profile<X>(store: &Store<ProfileReducer<SystemClock>, X>)
where
    X: single_entry_core::EffectExecutor<user_profile::ProfileEffect, ProfileEvent> + 'static,
{
    let (email, error, synced) = store
        .state(|s| (s.email.clone(), s.last_error.clone(), s.last_synced_at))
        .await;
    println!("Email: {email}");
    if let Some(error) = error {
        println!("Last error: {error}");
    }
    if let Some(synced) = synced {
        println!("Synced at: {synced}");
    }
}
