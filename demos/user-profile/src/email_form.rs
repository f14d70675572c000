//! Email form: the synchronous variant.
//!
//! Typing updates the draft, tapping the button copies it to the saved
//! value. No effects are ever requested, so every sequence of events is a
//! pure fold over the state.

use serde::{Deserialize, Serialize};
use single_entry_core::{
    DerivationError, Describe, Effects, HandlerError, Named, Parameters, insert_parameter,
    reducer::Reducer,
};
use single_entry_macros::Event;
use std::convert::Infallible;

/// Observable fields of the email form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailFormState {
    /// What the user typed last
    pub email: String,
    /// What the user last confirmed
    pub saved_email: String,
}

/// Everything that can happen to the email form
#[derive(Event, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailFormEvent {
    /// The text field changed
    #[intent]
    UserTypesNewEmail(String),

    /// The user confirmed the typed email
    #[intent]
    UserTapsChangeEmailButton,
}

impl Describe for EmailFormEvent {
    fn parameters(&self) -> Result<Parameters, DerivationError> {
        let mut params = Parameters::new();
        match self {
            Self::UserTypesNewEmail(email) => {
                insert_parameter(&mut params, self.name(), "email", email.as_str())?;
            },
            Self::UserTapsChangeEmailButton => {},
        }
        Ok(params)
    }
}

/// Reducer of the email form
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFormReducer;

impl Reducer for EmailFormReducer {
    type State = EmailFormState;
    type Event = EmailFormEvent;
    type Effect = Infallible;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        event: Self::Event,
        _env: &Self::Environment,
    ) -> Result<Effects<Self::Effect>, HandlerError> {
        match event {
            EmailFormEvent::UserTypesNewEmail(email) => {
                state.email = email;
            },
            EmailFormEvent::UserTapsChangeEmailButton => {
                state.saved_email.clone_from(&state.email);
            },
        }
        Ok(Effects::new())
    }
}
