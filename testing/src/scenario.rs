//! Scenario tests against a live [`Store`]
//!
//! A scenario is a list of events, each followed by expectations about the
//! state visible right after [`Store::handle`] returns. Once every step ran,
//! the harness drops the store and checks that nothing kept it alive.
//!
//! # Example
//!
//! ```ignore
//! ScenarioTest::new(|| Store::new(ProfileState::default(), ProfileReducer::new(), env(), executor))
//!     .when(ProfileEvent::SystemShowsUserProfileView)
//!     .then("loading", ProfileState::is_loading, true)
//!     .when(ProfileEvent::NetworkFinishesLoadingProfile(Ticket::new(1), Ok(profile)))
//!     .then("loading", ProfileState::is_loading, false)
//!     .then("email", |s| s.email.clone(), "a@x.com".to_string())
//!     .run()
//!     .await;
//! ```

use single_entry_core::{effect::EffectExecutor, event::Named, reducer::Reducer};
use single_entry_runtime::{EffectHandle, Store, StoreError, WeakStore};
use std::fmt::Debug;
use std::time::Duration;

/// Check run against the state after a step
type Check<S> = Box<dyn FnOnce(&S) -> Result<(), String>>;

enum Step<R: Reducer> {
    When(R::Event),
    Then(Check<R::State>),
    Rejected,
    Settle(Duration),
}

/// How long the harness waits for the store to be released
const RELEASE_ATTEMPTS: usize = 100;

/// Event/field/value scenarios over a fresh store
pub struct ScenarioTest<R, X, F>
where
    R: Reducer,
{
    factory: F,
    steps: Vec<Step<R>>,
    _executor: std::marker::PhantomData<fn() -> X>,
}

impl<R, X, F> ScenarioTest<R, X, F>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Send + Sync + 'static,
    R::Event: Named + Clone + Debug + Send + Sync + 'static,
    R::Effect: Send + 'static,
    R::Environment: Send + Sync + 'static,
    X: EffectExecutor<R::Effect, R::Event> + 'static,
    F: FnOnce() -> Store<R, X>,
{
    /// Start a scenario; `factory` builds the store under test
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            steps: Vec::new(),
            _executor: std::marker::PhantomData,
        }
    }

    /// Send an event through the store's single entry point
    #[must_use]
    pub fn when(mut self, event: R::Event) -> Self {
        self.steps.push(Step::When(event));
        self
    }

    /// Expect `field(state) == expected` after the previous event
    #[must_use]
    pub fn then<T, G>(mut self, label: &'static str, field: G, expected: T) -> Self
    where
        T: PartialEq + Debug + 'static,
        G: FnOnce(&R::State) -> T + 'static,
    {
        self.steps.push(Step::Then(Box::new(move |state| {
            let actual = field(state);
            if actual == expected {
                Ok(())
            } else {
                Err(format!("`{label}`: expected {expected:?}, got {actual:?}"))
            }
        })));
        self
    }

    /// Expect the previous event to have been rejected by the reducer
    #[must_use]
    pub fn then_rejected(mut self) -> Self {
        self.steps.push(Step::Rejected);
        self
    }

    /// Wait for the effects requested by the previous event to complete
    #[must_use]
    pub fn settle(mut self, timeout: Duration) -> Self {
        self.steps.push(Step::Settle(timeout));
        self
    }

    /// Run every step, then check the store is released
    ///
    /// # Panics
    ///
    /// Panics on the first failed expectation, on an unexpected rejection,
    /// or if the store is still alive after it was dropped.
    #[allow(clippy::panic)] // Test harness reports failures by panicking
    pub async fn run(self) {
        let store = (self.factory)();
        let weak = store.downgrade();

        let mut last: Option<(String, Result<EffectHandle, StoreError>)> = None;
        let mut checked = true;

        for (index, step) in self.steps.into_iter().enumerate() {
            match step {
                Step::When(event) => {
                    if let Some((description, Err(error))) = &last {
                        if !checked {
                            panic!("step {index}: event {description} was rejected: {error}");
                        }
                    }
                    let description = format!("{event:?}");
                    let outcome = store.handle(event).await;
                    last = Some((description, outcome));
                    checked = false;
                },
                Step::Then(check) => {
                    if let Some((description, Err(error))) = &last {
                        if !checked {
                            panic!("step {index}: event {description} was rejected: {error}");
                        }
                    }
                    let result = store.state(check).await;
                    if let Err(failure) = result {
                        let description = last.as_ref().map_or("<none>", |(d, _)| d.as_str());
                        panic!("step {index} after {description}: {failure}");
                    }
                },
                Step::Rejected => match &last {
                    Some((_, Err(StoreError::Handler(_)))) => checked = true,
                    Some((description, Err(error))) => {
                        panic!("step {index}: {description} failed outside the reducer: {error}");
                    },
                    Some((description, Ok(_))) => {
                        panic!("step {index}: expected {description} to be rejected");
                    },
                    None => panic!("step {index}: then_rejected() before any when()"),
                },
                Step::Settle(timeout) => {
                    if let Some((description, Ok(handle))) = &mut last {
                        if handle.wait_with_timeout(timeout).await.is_err() {
                            panic!("step {index}: effects of {description} did not settle");
                        }
                    }
                },
            }
        }

        if let Some((description, Err(error))) = &last {
            if !checked {
                panic!("event {description} was rejected: {error}");
            }
        }

        drop(last);
        drop(store);
        assert_released(&weak).await;
    }
}

/// Wait briefly for in-progress effect tasks to let go of the store
#[allow(clippy::panic)] // Test harness reports failures by panicking
async fn assert_released<R: Reducer, X>(weak: &WeakStore<R, X>) {
    for _ in 0..RELEASE_ATTEMPTS {
        if weak.is_released() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("store is still alive after the scenario dropped it");
}
