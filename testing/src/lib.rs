//! # Single Entry Testing
//!
//! Testing utilities and helpers for single-entry reducers.
//!
//! This crate provides:
//! - Test doubles for injected capabilities (clock, effect executors)
//! - Collecting analytics, crash-report and log sinks
//! - [`ReducerTest`]: Given/When/Then over a bare reducer
//! - [`ScenarioTest`]: event/field/value sequences against a live `Store`,
//!   ending with a check that the store was released
//!
//! ## Example
//!
//! ```ignore
//! use single_entry_testing::{RecordingExecutor, ScenarioTest};
//!
//! #[tokio::test]
//! async fn test_profile_load() {
//!     ScenarioTest::new(|| {
//!         Store::new(ProfileState::default(), ProfileReducer::new(), env(), RecordingExecutor::new())
//!     })
//!     .when(ProfileEvent::SystemShowsUserProfileView)
//!     .then("loading", ProfileState::is_loading, true)
//!     .run()
//!     .await;
//! }
//! ```

use chrono::{DateTime, Utc};
use single_entry_core::environment::Clock;


/// Scenario harness over a live store
pub mod scenario;

/// Mock implementations of injected capabilities and observability sinks
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use single_entry_core::effect::EffectExecutor;
    use single_entry_core::event::AnalyticsRecord;
    use single_entry_runtime::logging::{LogRecord, LogSink, Severity, SinkError};
    use single_entry_runtime::middleware::{AnalyticsSink, CrashReporter, Incident};
    use std::future::Future;
    use std::marker::PhantomData;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use single_entry_testing::mocks::FixedClock;
    /// use single_entry_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Executor that records effects and never completes them
    ///
    /// Use it when a test sends completion events by hand: effects stay
    /// outstanding forever, so nothing races with the test.
    pub struct RecordingExecutor<Ef, Ev> {
        effects: Arc<Mutex<Vec<Ef>>>,
        recorded: Arc<Notify>,
        _event: PhantomData<fn() -> Ev>,
    }

    impl<Ef, Ev> RecordingExecutor<Ef, Ev> {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self {
                effects: Arc::new(Mutex::new(Vec::new())),
                recorded: Arc::new(Notify::new()),
                _event: PhantomData,
            }
        }

        /// Number of effects executed so far
        #[must_use]
        pub fn len(&self) -> usize {
            lock(&self.effects).len()
        }

        /// Returns `true` if no effect was executed yet
        #[must_use]
        pub fn is_empty(&self) -> bool {
            lock(&self.effects).is_empty()
        }
    }

    impl<Ef: Clone, Ev> RecordingExecutor<Ef, Ev> {
        /// Effects executed so far, in execution order
        #[must_use]
        pub fn effects(&self) -> Vec<Ef> {
            lock(&self.effects).clone()
        }

        /// Wait until at least `count` effects were executed
        ///
        /// Effect tasks run on the runtime, so a freshly requested effect is
        /// only recorded once its task has been polled.
        ///
        /// Returns whatever was recorded when `timeout` expires.
        pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Ef> {
            let _ = tokio::time::timeout(timeout, async {
                loop {
                    let notified = self.recorded.notified();
                    if self.len() >= count {
                        return;
                    }
                    notified.await;
                }
            })
            .await;
            self.effects()
        }
    }

    impl<Ef, Ev> Default for RecordingExecutor<Ef, Ev> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<Ef, Ev> Clone for RecordingExecutor<Ef, Ev> {
        fn clone(&self) -> Self {
            Self {
                effects: Arc::clone(&self.effects),
                recorded: Arc::clone(&self.recorded),
                _event: PhantomData,
            }
        }
    }

    impl<Ef: Send, Ev: Send> EffectExecutor<Ef, Ev> for RecordingExecutor<Ef, Ev> {
        fn execute(&self, effect: Ef) -> Pin<Box<dyn Future<Output = Ev> + Send + '_>> {
            lock(&self.effects).push(effect);
            self.recorded.notify_waiters();
            Box::pin(std::future::pending())
        }
    }

    /// Holds completions of a [`ScriptedExecutor`] until released
    #[derive(Clone)]
    pub struct Gate {
        permits: Arc<Semaphore>,
    }

    impl Gate {
        fn new() -> Self {
            Self {
                permits: Arc::new(Semaphore::new(0)),
            }
        }

        /// Let `count` held completions through
        pub fn release(&self, count: usize) {
            self.permits.add_permits(count);
        }

        async fn pass(&self) {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
        }
    }

    type Script<Ef, Ev> = dyn Fn(Ef) -> Ev + Send + Sync;

    /// Executor producing completions from a closure
    ///
    /// # Example
    ///
    /// ```ignore
    /// let executor = ScriptedExecutor::new(|effect| match effect {
    ///     ProfileEffect::LoadProfile(t) => ProfileEvent::NetworkFinishesLoadingProfile(t, Ok(profile())),
    ///     ProfileEffect::SaveProfile(t, p) => ProfileEvent::NetworkFinishesSavingProfile(t, Ok(p)),
    /// });
    /// ```
    pub struct ScriptedExecutor<Ef, Ev> {
        script: Arc<Script<Ef, Ev>>,
        gate: Option<Gate>,
        calls: Arc<AtomicUsize>,
    }

    impl<Ef, Ev> ScriptedExecutor<Ef, Ev> {
        /// Complete every effect with `script(effect)`
        pub fn new(script: impl Fn(Ef) -> Ev + Send + Sync + 'static) -> Self {
            Self {
                script: Arc::new(script),
                gate: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Hold every completion until the returned [`Gate`] releases it
        #[must_use]
        pub fn gated(mut self) -> (Self, Gate) {
            let gate = Gate::new();
            self.gate = Some(gate.clone());
            (self, gate)
        }

        /// Number of effects executed so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl<Ef, Ev> Clone for ScriptedExecutor<Ef, Ev> {
        fn clone(&self) -> Self {
            Self {
                script: Arc::clone(&self.script),
                gate: self.gate.clone(),
                calls: Arc::clone(&self.calls),
            }
        }
    }

    impl<Ef: Send, Ev: Send> EffectExecutor<Ef, Ev> for ScriptedExecutor<Ef, Ev> {
        fn execute(&self, effect: Ef) -> Pin<Box<dyn Future<Output = Ev> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.pass().await;
                }
                (self.script)(effect)
            })
        }
    }

    /// Analytics sink that keeps every record
    #[derive(Debug, Default)]
    pub struct CollectingAnalytics {
        records: Mutex<Vec<AnalyticsRecord>>,
    }

    impl CollectingAnalytics {
        /// Records received so far
        #[must_use]
        pub fn records(&self) -> Vec<AnalyticsRecord> {
            lock(&self.records).clone()
        }

        /// Names of the records received so far
        #[must_use]
        pub fn names(&self) -> Vec<&'static str> {
            lock(&self.records).iter().map(|record| record.name).collect()
        }
    }

    impl AnalyticsSink for CollectingAnalytics {
        fn track(&self, record: AnalyticsRecord) {
            lock(&self.records).push(record);
        }
    }

    /// Crash reporter that keeps every incident
    #[derive(Debug, Default)]
    pub struct CollectingCrashReporter {
        incidents: Mutex<Vec<Incident>>,
    }

    impl CollectingCrashReporter {
        /// Incidents received so far
        #[must_use]
        pub fn incidents(&self) -> Vec<Incident> {
            lock(&self.incidents).clone()
        }
    }

    impl CrashReporter for CollectingCrashReporter {
        fn report(&self, incident: Incident) {
            lock(&self.incidents).push(incident);
        }
    }

    /// Log sink that keeps `(severity, message)` pairs, optionally failing
    #[derive(Debug, Default)]
    pub struct CollectingLogSink {
        records: Mutex<Vec<(Severity, String)>>,
        failing: bool,
    }

    impl CollectingLogSink {
        /// A sink that records and then reports failure for every record
        #[must_use]
        pub fn failing() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                failing: true,
            }
        }

        /// Records received so far
        #[must_use]
        pub fn records(&self) -> Vec<(Severity, String)> {
            lock(&self.records).clone()
        }
    }

    impl LogSink for CollectingLogSink {
        fn receive(&self, record: &LogRecord) -> Result<(), SinkError> {
            lock(&self.records).push((record.severity, record.message.clone()));
            if self.failing {
                return Err(SinkError("collecting sink configured to fail".to_string()));
            }
            Ok(())
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly `tracing` subscriber
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{
    CollectingAnalytics, CollectingCrashReporter, CollectingLogSink, FixedClock, Gate,
    RecordingExecutor, ScriptedExecutor, test_clock,
};
pub use reducer_test::ReducerTest;
pub use scenario::ScenarioTest;
