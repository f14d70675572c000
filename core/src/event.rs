//! Event taxonomy traits and analytics records.
//!
//! Every event has a stable, compile-time name and belongs to one of two
//! conventional categories: intents (coming from outside the reducer) and
//! completions (carrying the result of an effect). Observability sinks receive
//! a flat record derived from each processed event.
//!
//! # Design
//!
//! Names and parameters come from explicit, exhaustive `match` tables rather
//! than from serializing the event and inspecting the output. Renaming a Rust
//! variant does not silently change an analytics name, and multi-field
//! payloads are flattened field by field.
//!
//! `Named` is usually generated with `#[derive(Event)]` from the
//! `single-entry-macros` crate; `Describe::parameters` is written by hand.
//!
//! # Example
//!
//! ```
//! use single_entry_core::event::{Describe, EventKind, Named, Parameters};
//! use single_entry_core::DerivationError;
//!
//! enum FormEvent {
//!     UserTypesNewEmail(String),
//!     UserTapsChangeEmailButton,
//! }
//!
//! impl Named for FormEvent {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             FormEvent::UserTypesNewEmail(_) => "userTypesNewEmail",
//!             FormEvent::UserTapsChangeEmailButton => "userTapsChangeEmailButton",
//!         }
//!     }
//!
//!     fn kind(&self) -> EventKind {
//!         EventKind::Intent
//!     }
//! }
//!
//! impl Describe for FormEvent {
//!     fn parameters(&self) -> Result<Parameters, DerivationError> {
//!         let mut params = Parameters::new();
//!         match self {
//!             FormEvent::UserTypesNewEmail(email) => {
//!                 params.insert("email".into(), email.clone());
//!             }
//!             FormEvent::UserTapsChangeEmailButton => {}
//!         }
//!         Ok(params)
//!     }
//! }
//!
//! let record = FormEvent::UserTypesNewEmail("a@x.com".into()).describe().unwrap();
//! assert_eq!(record.name, "userTypesNewEmail");
//! assert_eq!(record.parameters["email"], "a@x.com");
//! ```

use crate::error::DerivationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat key/value parameters of an analytics record, ordered by key.
pub type Parameters = BTreeMap<String, String>;

/// Conventional category of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Originates outside the reducer (user input, lifecycle signal).
    Intent,
    /// Carries the result of a previously requested effect.
    Completion,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intent => write!(f, "intent"),
            Self::Completion => write!(f, "completion"),
        }
    }
}

/// Stable naming of an event variant.
pub trait Named {
    /// Stable name of this variant, e.g. `"userTypesNewEmail"`.
    fn name(&self) -> &'static str;

    /// Whether this variant is an intent or a completion.
    fn kind(&self) -> EventKind;
}

/// Derivation of an analytics record from an event.
pub trait Describe: Named {
    /// Flatten the payload of this event into parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`DerivationError`] when a payload field cannot be encoded.
    fn parameters(&self) -> Result<Parameters, DerivationError>;

    /// Build the full analytics record for this event.
    ///
    /// # Errors
    ///
    /// Propagates the [`DerivationError`] from [`parameters`](Self::parameters).
    fn describe(&self) -> Result<AnalyticsRecord, DerivationError> {
        Ok(AnalyticsRecord {
            name: self.name(),
            kind: self.kind(),
            parameters: self.parameters()?,
        })
    }
}

/// Insert one parameter, rejecting values analytics transports cannot carry.
///
/// Values containing control characters (newlines, tabs, ...) break the
/// line-oriented sinks downstream and are refused.
///
/// # Errors
///
/// Returns a [`DerivationError`] naming `event` and `key` when `value`
/// contains a control character.
pub fn insert_parameter(
    params: &mut Parameters,
    event: &'static str,
    key: &str,
    value: impl Into<String>,
) -> Result<(), DerivationError> {
    let value = value.into();
    if value.chars().any(char::is_control) {
        return Err(DerivationError::new(
            event,
            format!("control character in `{key}`"),
        ));
    }
    params.insert(key.to_string(), value);
    Ok(())
}

/// A derived, transport-ready record of one processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsRecord {
    /// Stable event name.
    pub name: &'static str,
    /// Intent or completion.
    pub kind: EventKind,
    /// Flattened payload.
    pub parameters: Parameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Probe {
        Ping,
        Loaded(Result<u32, String>),
    }

    impl Named for Probe {
        fn name(&self) -> &'static str {
            match self {
                Self::Ping => "ping",
                Self::Loaded(_) => "loaded",
            }
        }

        fn kind(&self) -> EventKind {
            match self {
                Self::Ping => EventKind::Intent,
                Self::Loaded(_) => EventKind::Completion,
            }
        }
    }

    impl Describe for Probe {
        fn parameters(&self) -> Result<Parameters, DerivationError> {
            let mut params = Parameters::new();
            match self {
                Self::Ping => {}
                Self::Loaded(Ok(value)) => {
                    params.insert("value".into(), value.to_string());
                }
                Self::Loaded(Err(reason)) if reason.is_empty() => {
                    return Err(DerivationError::new(self.name(), "empty error payload"));
                }
                Self::Loaded(Err(reason)) => {
                    params.insert("error".into(), reason.clone());
                }
            }
            Ok(params)
        }
    }

    #[test]
    fn describe_carries_name_kind_and_parameters() {
        let record = Probe::Loaded(Ok(3)).describe();
        assert_eq!(
            record,
            Ok(AnalyticsRecord {
                name: "loaded",
                kind: EventKind::Completion,
                parameters: Parameters::from([("value".to_string(), "3".to_string())]),
            })
        );
    }

    #[test]
    fn describe_is_deterministic() {
        assert_eq!(Probe::Ping.describe(), Probe::Ping.describe());
    }

    #[test]
    fn describe_propagates_derivation_error() {
        let error = Probe::Loaded(Err(String::new())).describe();
        assert_eq!(error, Err(DerivationError::new("loaded", "empty error payload")));
    }

    #[test]
    fn insert_parameter_refuses_control_characters() {
        let mut params = Parameters::new();
        assert_eq!(insert_parameter(&mut params, "typed", "email", "a@x.com"), Ok(()));
        assert_eq!(
            insert_parameter(&mut params, "typed", "email", "a@x.com\n"),
            Err(DerivationError::new("typed", "control character in `email`"))
        );
        assert_eq!(params.len(), 1);
        assert_eq!(params["email"], "a@x.com");
    }

    #[test]
    fn kind_display() {
        assert_eq!(EventKind::Intent.to_string(), "intent");
        assert_eq!(EventKind::Completion.to_string(), "completion");
    }
}
