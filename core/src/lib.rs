//! # Single Entry Core
//!
//! Core traits and types for handling user intents and asynchronous effects
//! through a single entry point.
//!
//! A host object owns some observable **State**. Everything that can happen to
//! it is an **Event**: intents coming from outside (a user typing, a view
//! appearing) and completions of work the host asked for earlier. Events are
//! consumed one at a time by a **Reducer**, which mutates State synchronously
//! and may request **Effects**. Effects are values; an injected
//! [`EffectExecutor`](effect::EffectExecutor) turns each one into exactly one
//! completion Event, which re-enters the same reducer.
//!
//! ## Core Concepts
//!
//! - **State**: Observable fields, mutated only by the reducer
//! - **Event**: Closed set of intents and completions
//! - **Effect**: Closed set of external operations to perform
//! - **Reducer**: `(State, Event, Environment) → Result<Effects, HandlerError>`
//! - **Flight**: Per-category in-flight indicator guarding completions
//!
//! ## Example
//!
//! ```ignore
//! use single_entry_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct ProfileState {
//!     email: String,
//!     load: Flight,
//! }
//!
//! impl Reducer for ProfileReducer {
//!     type State = ProfileState;
//!     type Event = ProfileEvent;
//!     type Effect = ProfileEffect;
//!     type Environment = ProfileEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ProfileState,
//!         event: ProfileEvent,
//!         env: &ProfileEnvironment,
//!     ) -> Result<Effects<ProfileEffect>, HandlerError> {
//!         match event {
//!             ProfileEvent::SystemShowsUserProfileView => {
//!                 if let Some(ticket) = state.load.begin() {
//!                     return Ok(smallvec![ProfileEffect::LoadProfile(ticket)]);
//!                 }
//!                 Ok(Effects::new())
//!             }
//!             ProfileEvent::NetworkFinishesLoadingProfile(ticket, result) => {
//!                 state.load.land(ticket, "load", "networkFinishesLoadingProfile")?;
//!                 // apply result
//!                 Ok(Effects::new())
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub use error::{DerivationError, EffectError, HandlerError};
pub use event::{AnalyticsRecord, Describe, EventKind, Named, Parameters, insert_parameter};
pub use flight::{Flight, Ticket};

/// Error types shared by reducers, executors and observability
pub mod error;

/// Event taxonomy traits and analytics records
pub mod event;

/// In-flight indicator for effect categories
pub mod flight;

/// Reducer module - The single synchronous entry point
///
/// Reducers consume one event at a time. They are the only place allowed to
/// mutate State and the only place deciding whether an error is fatal
/// (returned to the caller) or recoverable (written into State).
pub mod reducer {
    use super::effect::Effects;
    use super::error::HandlerError;

    /// The Reducer trait - core abstraction for event handling
    ///
    /// # Type Parameters
    ///
    /// - `State`: The observable state this reducer mutates
    /// - `Event`: The closed set of events it consumes
    /// - `Effect`: The closed set of effects it may request
    /// - `Environment`: The injected dependencies it reads (clock, ...)
    ///
    /// # Contract
    ///
    /// - Matches on `Event` without a wildcard arm, so adding a case is a
    ///   compile error until it is handled.
    /// - Validates before mutating: when `Err` is returned, `state` is untouched.
    /// - Never suspends and never performs I/O. External work is requested by
    ///   returning effects.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The event type this reducer consumes
        type Event;

        /// The effect type this reducer may request
        type Effect;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an event into state changes and effect requests
        ///
        /// # Errors
        ///
        /// Returns [`HandlerError::UnexpectedCompletion`] when a completion
        /// event arrives for a category that has no effect in flight.
        fn reduce(
            &self,
            state: &mut Self::State,
            event: Self::Event,
            env: &Self::Environment,
        ) -> Result<Effects<Self::Effect>, HandlerError>;
    }
}

/// Effect module - Effect requests and the executor boundary
///
/// Effects are plain values describing an external operation. They are
/// requested by reducers and executed by an [`EffectExecutor`], the only
/// component allowed to talk to the outside world.
pub mod effect {
    use smallvec::SmallVec;
    use std::convert::Infallible;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    /// Effects requested by a single reducer call
    ///
    /// Most transitions request zero or one effect, so the common case stays
    /// on the stack.
    pub type Effects<E> = SmallVec<[E; 4]>;

    /// Executes one effect and produces exactly one completion event
    ///
    /// The signature is infallible on purpose: a failed external operation is
    /// encoded as a completion event carrying an error payload, so it flows
    /// through the reducer like any success and the in-flight indicator is
    /// always cleared.
    ///
    /// # Dyn Compatibility
    ///
    /// Uses an explicit `Pin<Box<dyn Future>>` return so executors can be
    /// stored as trait objects and swapped for test doubles.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl EffectExecutor<ProfileEffect, ProfileEvent> for ProfileExecutor {
    ///     fn execute(
    ///         &self,
    ///         effect: ProfileEffect,
    ///     ) -> Pin<Box<dyn Future<Output = ProfileEvent> + Send + '_>> {
    ///         Box::pin(async move {
    ///             match effect {
    ///                 ProfileEffect::LoadProfile(ticket) => {
    ///                     ProfileEvent::NetworkFinishesLoadingProfile(ticket, self.api.load().await)
    ///                 }
    ///             }
    ///         })
    ///     }
    /// }
    /// ```
    pub trait EffectExecutor<Effect, Event>: Send + Sync {
        /// Perform the external operation described by `effect`
        fn execute(&self, effect: Effect) -> Pin<Box<dyn Future<Output = Event> + Send + '_>>;
    }

    /// Executor for reducers that never request effects
    ///
    /// Pair it with `type Effect = Infallible;`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NoEffects;

    impl<Event> EffectExecutor<Infallible, Event> for NoEffects {
        fn execute(&self, effect: Infallible) -> Pin<Box<dyn Future<Output = Event> + Send + '_>> {
            match effect {}
        }
    }

    impl<Effect, Event, X> EffectExecutor<Effect, Event> for Arc<X>
    where
        X: EffectExecutor<Effect, Event> + ?Sized,
    {
        fn execute(&self, effect: Effect) -> Pin<Box<dyn Future<Output = Event> + Send + '_>> {
            (**self).execute(effect)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// External capabilities a reducer reads synchronously are abstracted behind
/// traits and injected through the `Environment` parameter. Capabilities that
/// perform I/O belong to effect executors instead.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use effect::{EffectExecutor, Effects, NoEffects};
pub use environment::{Clock, SystemClock};
pub use reducer::Reducer;
