//! User profile: the effectful variant.
//!
//! Showing the view loads the profile, tapping the button saves the typed
//! email. Both go through the network, so each has its own in-flight
//! category (`load` and `save`) and its own completion event.
//!
//! ## State machine (per category)
//!
//! ```text
//! Idle --(intent)--> InFlight(t) --(completion t)--> Idle
//! Idle --(completion)--> UnexpectedCompletion (state unchanged)
//! InFlight(t) --(completion u != t)--> UnexpectedCompletion (state unchanged)
//! ```
//!
//! Each effect carries the [`Ticket`] of its flight and its completion echoes
//! it. Hiding the view abandons both categories; a completion that still
//! arrives afterwards is rejected, also when the view was shown again and a
//! newer load is in flight.
//!
//! At most one of the two categories is in flight at a time: a save is not
//! started while the load runs and a load is not started while the save runs,
//! so neither can overwrite `email` with a stale server copy.

use crate::api::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use single_entry_core::{
    DerivationError, Describe, EffectError, Effects, Flight, HandlerError, Named, Parameters,
    Ticket, environment::Clock, insert_parameter, reducer::Reducer, smallvec,
};
use single_entry_macros::Event;

/// Observable fields of the profile view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileState {
    /// Email as last confirmed by the server
    pub email: String,
    /// Display name as last confirmed by the server
    pub display_name: Option<String>,
    /// What the user typed in the email field
    pub draft_email: String,
    /// Profile load in flight
    pub load: Flight,
    /// Profile save in flight
    pub save: Flight,
    /// Failure of the last completed network operation, if it failed
    pub last_error: Option<EffectError>,
    /// When the server last confirmed the profile
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ProfileState {
    /// `true` while any network operation is outstanding
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.load.is_in_flight() || self.save.is_in_flight()
    }
}

/// Everything that can happen to the profile view
#[derive(Event, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileEvent {
    /// The view appeared
    #[intent]
    SystemShowsUserProfileView,

    /// The view went away
    #[intent]
    SystemHidesUserProfileView,

    /// The email field changed
    #[intent]
    UserTypesNewEmail(String),

    /// The user asked to save the typed email
    #[intent]
    UserTapsChangeEmailButton,

    /// Result of [`ProfileEffect::LoadProfile`], with the effect's ticket
    #[completion]
    NetworkFinishesLoadingProfile(Ticket, Result<Profile, EffectError>),

    /// Result of [`ProfileEffect::SaveProfile`], with the effect's ticket
    #[completion]
    NetworkFinishesSavingProfile(Ticket, Result<Profile, EffectError>),
}

impl Describe for ProfileEvent {
    fn parameters(&self) -> Result<Parameters, DerivationError> {
        let name = self.name();
        let mut params = Parameters::new();
        match self {
            Self::SystemShowsUserProfileView
            | Self::SystemHidesUserProfileView
            | Self::UserTapsChangeEmailButton => {},
            Self::UserTypesNewEmail(email) => {
                insert_parameter(&mut params, name, "email", email.as_str())?;
            },
            Self::NetworkFinishesLoadingProfile(_, result)
            | Self::NetworkFinishesSavingProfile(_, result) => {
                match result {
                    Ok(profile) => {
                        insert_parameter(&mut params, name, "outcome", "success")?;
                        insert_parameter(&mut params, name, "email", profile.email.as_str())?;
                        if let Some(display_name) = &profile.display_name {
                            insert_parameter(&mut params, name, "displayName", display_name.as_str())?;
                        }
                    },
                    Err(error) => {
                        insert_parameter(&mut params, name, "outcome", "failure")?;
                        insert_parameter(&mut params, name, "error", error.to_string())?;
                    },
                }
            },
        }
        Ok(params)
    }
}

/// External operations the profile view may request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileEffect {
    /// Fetch the current profile
    LoadProfile(Ticket),
    /// Store the given profile
    SaveProfile(Ticket, Profile),
}

/// Injected dependencies of the profile reducer
#[derive(Debug, Clone)]
pub struct ProfileEnvironment<C: Clock> {
    /// Source of `last_synced_at`
    pub clock: C,
}

impl<C: Clock> ProfileEnvironment<C> {
    /// Create a new environment with the given clock
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }
}

/// Reducer of the profile view
///
/// Generic over the Clock type C to work with any clock implementation.
#[derive(Debug, Clone, Copy)]
pub struct ProfileReducer<C> {
    _phantom: std::marker::PhantomData<C>,
}

impl<C> ProfileReducer<C> {
    /// Create a new profile reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<C> Default for ProfileReducer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Reducer for ProfileReducer<C> {
    type State = ProfileState;
    type Event = ProfileEvent;
    type Effect = ProfileEffect;
    type Environment = ProfileEnvironment<C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        event: Self::Event,
        env: &Self::Environment,
    ) -> Result<Effects<Self::Effect>, HandlerError> {
        let name = event.name();
        match event {
            ProfileEvent::SystemShowsUserProfileView => {
                // Loading while a save runs could bring back the pre-save copy
                if state.save.is_in_flight() {
                    tracing::debug!("Profile load ignored while a save is in flight");
                    return Ok(Effects::new());
                }
                let Some(ticket) = state.load.begin() else {
                    tracing::debug!("Profile load already in flight");
                    return Ok(Effects::new());
                };
                Ok(smallvec![ProfileEffect::LoadProfile(ticket)])
            },
            ProfileEvent::SystemHidesUserProfileView => {
                state.load.abort();
                state.save.abort();
                Ok(Effects::new())
            },
            ProfileEvent::UserTypesNewEmail(email) => {
                state.draft_email = email;
                Ok(Effects::new())
            },
            ProfileEvent::UserTapsChangeEmailButton => {
                // Saving before the load landed would overwrite the server copy
                if state.load.is_in_flight() {
                    tracing::debug!("Profile save ignored while a load is in flight");
                    return Ok(Effects::new());
                }
                let Some(ticket) = state.save.begin() else {
                    tracing::debug!("Profile save already in flight");
                    return Ok(Effects::new());
                };
                Ok(smallvec![ProfileEffect::SaveProfile(
                    ticket,
                    Profile {
                        email: state.draft_email.clone(),
                        display_name: state.display_name.clone(),
                    }
                )])
            },
            ProfileEvent::NetworkFinishesLoadingProfile(ticket, result) => {
                state.load.land(ticket, "load", name)?;
                match result {
                    Ok(profile) => {
                        state.draft_email.clone_from(&profile.email);
                        state.email = profile.email;
                        state.display_name = profile.display_name;
                        state.last_error = None;
                        state.last_synced_at = Some(env.clock.now());
                    },
                    Err(error) => state.last_error = Some(error),
                }
                Ok(Effects::new())
            },
            ProfileEvent::NetworkFinishesSavingProfile(ticket, result) => {
                state.save.land(ticket, "save", name)?;
                match result {
                    Ok(profile) => {
                        state.email = profile.email;
                        state.display_name = profile.display_name;
                        state.last_error = None;
                        state.last_synced_at = Some(env.clock.now());
                    },
                    Err(error) => state.last_error = Some(error),
                }
                Ok(Effects::new())
            },
        }
    }
}
