//! # Single Entry Runtime
//!
//! Runtime host for single-entry reducers.
//!
//! This crate provides the [`Store`], the object that owns a reducer's State
//! and exposes its single entry point, [`Store::handle`].
//!
//! ## Core Components
//!
//! - **Store**: Owns state, serializes `handle` calls, spawns effects
//! - **Effect tasks**: Run the injected executor and feed completions back in
//! - **Middleware**: Fixed decorator chain around each transition
//!   (analytics, crash reporting, tracing)
//! - **Logger**: Synchronous fan-out to registered log sinks
//!
//! ## Example
//!
//! ```ignore
//! use single_entry_runtime::Store;
//!
//! let store = Store::new(
//!     ProfileState::default(),
//!     ProfileReducer::new(),
//!     environment,
//!     ProfileExecutor::new(api),
//! );
//!
//! // Send an event
//! store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
//!
//! // Read state
//! let loading = store.state(|s| s.is_loading()).await;
//! ```

use single_entry_core::{
    effect::EffectExecutor, event::Named, reducer::Reducer, HandlerError,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Analytics, crash reporting and tracing around each transition
pub mod middleware;

/// Logging façade with fan-out to registered sinks
pub mod logging;

/// Error types for the Store runtime
pub mod error {
    use single_entry_core::HandlerError;
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The reducer rejected the event
        ///
        /// State is unchanged. The crash-reporting middleware, if installed,
        /// has already received the error.
        #[error(transparent)]
        Handler(#[from] HandlerError),

        /// Store is shutting down and not accepting new events
        ///
        /// This error is returned when `handle()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a completion event
        ///
        /// Returned by `handle_and_wait_for` when the timeout expires before
        /// a matching event is received.
        #[error("Timeout waiting for event")]
        Timeout,

        /// Completion broadcast channel closed
        #[error("Completion broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;
pub use logging::{
    LogRecord, LogSink, Logger, LoggingAnalytics, LoggingCrashReporter, Severity, SinkError,
    TracingSink,
};
pub use middleware::{
    AnalyticsMiddleware, AnalyticsSink, CrashReporter, CrashReportingMiddleware, Incident,
    Middleware, TracingMiddleware,
};

use std::sync::Weak;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use single_entry_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of completion events buffered for slow subscribers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the completion broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::handle()`]. Counts the effect tasks spawned by one
/// event; a task finishes once its completion event has been reduced (or
/// dropped because the store was released).
///
/// # Example
///
/// ```ignore
/// let mut handle = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The profile load has completed and been reduced
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle and the tracking context for its tasks
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effect tasks still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed into effect tasks
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the executor panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The host of a reducer
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration,
        EffectExecutor, EffectHandle, EffectTracking, HandlerError, Middleware, Named, Ordering,
        Reducer, RwLock, StoreConfig, StoreError, Weak,
    };
    use tokio::sync::broadcast;

    /// Shared part of a [`Store`]
    ///
    /// Effect tasks only ever hold a [`Weak`] to this, so a running effect
    /// never keeps its host alive.
    struct Inner<R, X>
    where
        R: Reducer,
    {
        state: RwLock<R::State>,
        reducer: R,
        environment: R::Environment,
        executor: Arc<X>,
        middleware: Vec<Box<dyn Middleware<R::Event>>>,
        config: StoreConfig,
        shutdown: AtomicBool,
        pending_effects: Arc<AtomicUsize>,
        completions: broadcast::Sender<R::Event>,
    }

    /// The Store - host object of a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; `handle` takes the write lock, so two
    ///    transitions never interleave)
    /// 2. Reducer (the single entry point's logic)
    /// 3. Environment (injected dependencies read by the reducer)
    /// 4. Effect executor (injected; the only boundary to the outside world)
    /// 5. Middleware chain (fixed at construction)
    ///
    /// Cloning a `Store` clones a handle to the same host.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Store::builder(
    ///     ProfileState::default(),
    ///     ProfileReducer::new(),
    ///     ProfileEnvironment::new(SystemClock),
    ///     ProfileExecutor::new(api),
    /// )
    /// .middleware(CrashReportingMiddleware::new(reporter))
    /// .build();
    ///
    /// store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
    /// ```
    pub struct Store<R, X>
    where
        R: Reducer,
    {
        inner: Arc<Inner<R, X>>,
    }

    /// Non-owning reference to a [`Store`]
    pub struct WeakStore<R, X>
    where
        R: Reducer,
    {
        inner: Weak<Inner<R, X>>,
    }

    /// Builder for a [`Store`] with middleware and configuration
    pub struct StoreBuilder<R, X>
    where
        R: Reducer,
    {
        state: R::State,
        reducer: R,
        environment: R::Environment,
        executor: Arc<X>,
        middleware: Vec<Box<dyn Middleware<R::Event>>>,
        config: StoreConfig,
    }

    impl<R, X> StoreBuilder<R, X>
    where
        R: Reducer,
        R::Event: Clone,
    {
        /// Append a middleware to the chain
        ///
        /// `before` hooks run in registration order, `after` hooks in reverse.
        #[must_use]
        pub fn middleware(mut self, middleware: impl Middleware<R::Event> + 'static) -> Self {
            self.middleware.push(Box::new(middleware));
            self
        }

        /// Use a custom configuration
        #[must_use]
        pub fn config(mut self, config: StoreConfig) -> Self {
            self.config = config;
            self
        }

        /// Build the store
        #[must_use]
        pub fn build(self) -> Store<R, X> {
            let (completions, _) = broadcast::channel(self.config.broadcast_capacity.max(1));

            Store {
                inner: Arc::new(Inner {
                    state: RwLock::new(self.state),
                    reducer: self.reducer,
                    environment: self.environment,
                    executor: self.executor,
                    middleware: self.middleware,
                    config: self.config,
                    shutdown: AtomicBool::new(false),
                    pending_effects: Arc::new(AtomicUsize::new(0)),
                    completions,
                }),
            }
        }
    }

    impl<R, X> Store<R, X>
    where
        R: Reducer + Send + Sync + 'static,
        R::State: Send + Sync + 'static,
        R::Event: Named + Clone + Send + Sync + 'static,
        R::Effect: Send + 'static,
        R::Environment: Send + Sync + 'static,
        X: EffectExecutor<R::Effect, R::Event> + 'static,
    {
        /// Create a new store with initial state, reducer, environment and executor
        ///
        /// Uses the default [`StoreConfig`] and no middleware.
        #[must_use]
        pub fn new(initial_state: R::State, reducer: R, environment: R::Environment, executor: X) -> Self {
            Self::builder(initial_state, reducer, environment, executor).build()
        }

        /// Start building a store with middleware or a custom configuration
        #[must_use]
        pub fn builder(
            initial_state: R::State,
            reducer: R,
            environment: R::Environment,
            executor: X,
        ) -> StoreBuilder<R, X> {
            StoreBuilder {
                state: initial_state,
                reducer,
                environment,
                executor: Arc::new(executor),
                middleware: Vec::new(),
                config: StoreConfig::default(),
            }
        }

        /// The single entry point
        ///
        /// 1. Takes the write lock on state (serializes all transitions)
        /// 2. Runs the middleware `before` hooks
        /// 3. Calls the reducer with (state, event, environment)
        /// 4. Runs the middleware `after` hooks with the outcome
        /// 5. Spawns one task per requested effect and returns
        ///
        /// The caller is never blocked on effect execution. Each effect task
        /// feeds its completion event back through the same steps once the
        /// executor returns, unless the store has been released in the
        /// meantime. Completions still re-enter after [`shutdown`](Self::shutdown)
        /// began; only events from callers are refused.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Handler`]: the reducer rejected the event; state is unchanged
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn handle(&self, event: R::Event) -> Result<EffectHandle, StoreError> {
            if self.inner.shutdown.load(Ordering::Acquire) {
                tracing::warn!(event = event.name(), "Rejected event: store is shutting down");
                metrics::counter!("store.shutdown.rejected_events").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            self.dispatch(event).await
        }

        /// Run one event through middleware and reducer, then spawn its effects
        #[tracing::instrument(skip(self, event), fields(event = event.name()), name = "store_handle")]
        async fn dispatch(&self, event: R::Event) -> Result<EffectHandle, StoreError> {
            let name = event.name();
            metrics::counter!("store.events.total", "kind" => event.kind().to_string()).increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.inner.state.write().await;
                tracing::trace!("Acquired write lock on state");

                for middleware in &self.inner.middleware {
                    middleware.before(&event);
                }

                let start = std::time::Instant::now();
                let outcome = self
                    .inner
                    .reducer
                    .reduce(&mut *state, event, &self.inner.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                let summary: Result<usize, HandlerError> =
                    outcome.as_ref().map(|effects| effects.len()).map_err(Clone::clone);
                for middleware in self.inner.middleware.iter().rev() {
                    middleware.after(name, &summary);
                }

                outcome?
            };

            tracing::trace!("Reducer completed, spawning {} effects", effects.len());
            for effect in effects {
                self.spawn_effect(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Handle an event and wait for a matching completion event
        ///
        /// Subscribes to completions before handling, so a fast effect cannot
        /// slip past. The completion has already been reduced when it is
        /// returned, so [`state`](Self::state) reflects it.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching completion within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - any error of [`handle`](Self::handle)
        pub async fn handle_and_wait_for<F>(
            &self,
            event: R::Event,
            predicate: F,
            timeout: Duration,
        ) -> Result<R::Event, StoreError>
        where
            F: Fn(&R::Event) -> bool,
        {
            // Subscribe BEFORE handling to avoid race condition
            let mut rx = self.inner.completions.subscribe();

            self.handle(event).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(completion) if predicate(&completion) => return Ok(completion),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Completion observer lagged, {} events skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to completion events produced by effects
        ///
        /// Only completions are broadcast, not events passed to `handle` by
        /// callers. A completion is broadcast once it has been reduced,
        /// whether the reducer accepted it or not.
        #[must_use]
        pub fn subscribe_completions(&self) -> broadcast::Receiver<R::Event> {
            self.inner.completions.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let email = store.state(|s| s.email.clone()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            let state = self.inner.state.read().await;
            f(&*state)
        }

        /// Create a non-owning reference to this store
        #[must_use]
        pub fn downgrade(&self) -> WeakStore<R, X> {
            WeakStore {
                inner: Arc::downgrade(&self.inner),
            }
        }

        /// Number of effect tasks still running on this store
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.inner.pending_effects.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new events from callers) and waits
        /// for pending effects to complete. Their completions are still reduced.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.inner.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.inner.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`shutdown`](Self::shutdown).
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.inner.config.default_shutdown_timeout).await
        }

        /// Spawn the task executing one effect
        ///
        /// The task holds the executor and a [`Weak`] to the host. When the
        /// executor returns, the completion is dispatched if the host is still
        /// alive and dropped otherwise.
        fn spawn_effect(&self, effect: R::Effect, tracking: EffectTracking) {
            metrics::counter!("store.effects.spawned").increment(1);
            tracking.increment();

            // Track global pending effects for shutdown
            self.inner.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.inner.pending_effects));

            let executor = Arc::clone(&self.inner.executor);
            let host = Arc::downgrade(&self.inner);

            tokio::spawn(async move {
                let _guard = DecrementGuard(tracking);
                let _pending_guard = pending_guard; // Decrement on drop

                let completion = executor.execute(effect).await;
                let name = completion.name();

                let Some(inner) = host.upgrade() else {
                    tracing::debug!(event = name, "Store released before completion, dropping it");
                    metrics::counter!("store.completions.dropped").increment(1);
                    return;
                };
                let store = Store { inner };

                let observed = completion.clone();
                if let Err(error) = store.dispatch(completion).await {
                    metrics::counter!("store.completions.rejected").increment(1);
                    tracing::error!(event = name, error = %error, "Completion rejected");
                }

                // Observers see the completion after it was reduced
                let _ = store.inner.completions.send(observed);
            });
        }
    }

    impl<R, X> WeakStore<R, X>
    where
        R: Reducer,
    {
        /// Get the store back if it is still alive
        #[must_use]
        pub fn upgrade(&self) -> Option<Store<R, X>> {
            self.inner.upgrade().map(|inner| Store { inner })
        }

        /// Returns `true` once every `Store` handle has been dropped
        #[must_use]
        pub fn is_released(&self) -> bool {
            self.inner.strong_count() == 0
        }
    }

    impl<R, X> Clone for Store<R, X>
    where
        R: Reducer,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<R, X> Clone for WeakStore<R, X>
    where
        R: Reducer,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Weak::clone(&self.inner),
            }
        }
    }
}

// Re-export for convenience
pub use store::{Store, StoreBuilder, WeakStore};

#[cfg(test)]
mod tests {
    use super::*;
    use single_entry_core::{
        Effects, Flight, Ticket, smallvec,
        event::{EventKind, Named},
    };
    use std::future::Future;
    use std::pin::Pin;
    use tokio::sync::Semaphore;

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        fetch: Flight,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Increment,
        Fetch,
        FetchTwice,
        Fetched(Ticket, i32),
    }

    impl Named for TestEvent {
        fn name(&self) -> &'static str {
            match self {
                Self::Increment => "increment",
                Self::Fetch => "fetch",
                Self::FetchTwice => "fetchTwice",
                Self::Fetched(..) => "fetched",
            }
        }

        fn kind(&self) -> EventKind {
            match self {
                Self::Increment | Self::Fetch | Self::FetchTwice => EventKind::Intent,
                Self::Fetched(..) => EventKind::Completion,
            }
        }
    }

    #[derive(Debug, Clone)]
    enum TestEffect {
        Fetch(Ticket, i32),
    }

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Event = TestEvent;
        type Effect = TestEffect;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            event: Self::Event,
            _env: &Self::Environment,
        ) -> Result<Effects<Self::Effect>, HandlerError> {
            match event {
                TestEvent::Increment => {
                    state.value += 1;
                    Ok(Effects::new())
                },
                TestEvent::Fetch => Ok(match state.fetch.begin() {
                    Some(ticket) => smallvec![TestEffect::Fetch(ticket, 10)],
                    None => Effects::new(),
                }),
                TestEvent::FetchTwice => {
                    // Two effects of one category: the second completion is unexpected
                    let Some(ticket) = state.fetch.begin() else {
                        return Ok(Effects::new());
                    };
                    Ok(smallvec![TestEffect::Fetch(ticket, 1), TestEffect::Fetch(ticket, 2)])
                },
                TestEvent::Fetched(ticket, value) => {
                    state.fetch.land(ticket, "fetch", "fetched")?;
                    state.value += value;
                    Ok(Effects::new())
                },
            }
        }
    }

    struct Immediate;

    impl EffectExecutor<TestEffect, TestEvent> for Immediate {
        fn execute(&self, effect: TestEffect) -> Pin<Box<dyn Future<Output = TestEvent> + Send + '_>> {
            Box::pin(async move {
                match effect {
                    TestEffect::Fetch(ticket, value) => TestEvent::Fetched(ticket, value),
                }
            })
        }
    }

    /// Completes one effect per permit added to the semaphore
    struct Gated(Arc<Semaphore>);

    impl EffectExecutor<TestEffect, TestEvent> for Gated {
        fn execute(&self, effect: TestEffect) -> Pin<Box<dyn Future<Output = TestEvent> + Send + '_>> {
            Box::pin(async move {
                if let Ok(permit) = self.0.acquire().await {
                    permit.forget();
                }
                match effect {
                    TestEffect::Fetch(ticket, value) => TestEvent::Fetched(ticket, value),
                }
            })
        }
    }

    struct Never;

    impl EffectExecutor<TestEffect, TestEvent> for Never {
        fn execute(&self, _effect: TestEffect) -> Pin<Box<dyn Future<Output = TestEvent> + Send + '_>> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn test_store_creation() {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 0);
    }

    #[tokio::test]
    async fn test_pure_event() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let handle = store.handle(TestEvent::Increment).await?;
        assert_eq!(handle.pending(), 0);
        assert_eq!(store.state(|s| s.value).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_completion_reenters_handle() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let mut handle = store.handle(TestEvent::Fetch).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        let (value, fetch) = store.state(|s| (s.value, s.fetch)).await;
        assert_eq!(value, 10);
        assert_eq!(fetch.ticket(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_in_flight_until_completion() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Never);

        store.handle(TestEvent::Fetch).await?;
        assert!(store.state(|s| s.fetch.is_in_flight()).await);

        store.handle(TestEvent::Increment).await?;
        store.handle(TestEvent::Increment).await?;
        assert!(store.state(|s| s.fetch.is_in_flight()).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_unexpected_completion_is_returned() {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let result = store.handle(TestEvent::Fetched(Ticket::new(1), 5)).await;
        assert_eq!(
            result.err(),
            Some(StoreError::Handler(HandlerError::unexpected_completion(
                "fetch", "fetched"
            )))
        );
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_second_completion_of_category_is_rejected() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let mut handle = store.handle(TestEvent::FetchTwice).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        // Exactly one of the two completions was applied
        let value = store.state(|s| s.value).await;
        assert!(value == 1 || value == 2, "unexpected value {value}");
        assert!(!store.state(|s| s.fetch.is_in_flight()).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_released_store_drops_completion() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Never);
        let weak = store.downgrade();

        store.handle(TestEvent::Fetch).await?;
        drop(store);

        // The pending effect task holds only a weak reference
        assert!(weak.is_released());
        assert!(weak.upgrade().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_and_wait_for_completion() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let completion = store
            .handle_and_wait_for(
                TestEvent::Fetch,
                |e| matches!(e, TestEvent::Fetched(..)),
                Duration::from_secs(1),
            )
            .await?;
        assert_eq!(completion, TestEvent::Fetched(Ticket::new(1), 10));

        // Already reduced when it is observed
        let (value, fetch) = store.state(|s| (s.value, s.fetch)).await;
        assert_eq!(value, 10);
        assert!(!fetch.is_in_flight());
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_events() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        store.shutdown(Duration::from_secs(1)).await?;
        let result = store.handle(TestEvent::Increment).await;
        assert_eq!(result.err(), Some(StoreError::ShutdownInProgress));
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_completion_to_be_reduced() -> Result<(), StoreError> {
        let permits = Arc::new(Semaphore::new(0));
        let store = Store::new(TestState::default(), TestReducer, (), Gated(Arc::clone(&permits)));

        store.handle(TestEvent::Fetch).await?;
        let shutdown = tokio::spawn({
            let store = store.clone();
            async move { store.shutdown(Duration::from_secs(2)).await }
        });

        // Wait until shutdown refuses callers, then let the effect finish
        let mut increments = 0;
        while store.handle(TestEvent::Increment).await.is_ok() {
            increments += 1;
            tokio::task::yield_now().await;
        }
        permits.add_permits(1);

        let result = shutdown.await.unwrap_or(Err(StoreError::ChannelClosed));
        assert_eq!(result, Ok(()));

        let (value, fetch) = store.state(|s| (s.value, s.fetch)).await;
        assert!(!fetch.is_in_flight());
        assert_eq!(value, increments + 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_stuck_effect() -> Result<(), StoreError> {
        let store = Store::new(TestState::default(), TestReducer, (), Never);

        store.handle(TestEvent::Fetch).await?;
        let result = store.shutdown(Duration::from_millis(30)).await;
        assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
        Ok(())
    }

    #[tokio::test]
    #[allow(clippy::panic)] // Tests are allowed to panic on failures
    async fn test_concurrent_handles_serialize() {
        let store = Store::new(TestState::default(), TestReducer, (), Immediate);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.handle(TestEvent::Increment).await;
                })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                panic!("concurrent handle task panicked: {e}");
            }
        }

        assert_eq!(store.state(|s| s.value).await, 10);
    }

    #[tokio::test]
    async fn test_completed_handle_does_not_wait() -> Result<(), StoreError> {
        let mut handle = EffectHandle::completed();
        handle.wait_with_timeout(Duration::from_millis(10)).await
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new(4, Duration::from_secs(1))
            .with_broadcast_capacity(8)
            .with_shutdown_timeout(Duration::from_secs(2));
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.default_shutdown_timeout, Duration::from_secs(2));
    }
}
