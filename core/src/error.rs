//! Error types for event handling.
//!
//! Three kinds of failure exist and each travels a different path:
//!
//! - [`HandlerError`] is returned by the single entry point when an event
//!   cannot be applied (e.g. a completion nobody was waiting for). State is
//!   left unchanged.
//! - [`EffectError`] is never returned. It is the typed error payload carried
//!   by completion events, so failed effects are reduced like successes.
//! - [`DerivationError`] comes from the analytics mapping. It is reported on
//!   its own and never blocks the transition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a reducer's entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A completion event arrived while its category was not in flight.
    ///
    /// Typical causes: a duplicate completion, a completion that outlived a
    /// cancelled operation, or a test sending a completion with no matching
    /// intent. Must be reported; it is never silently absorbed.
    #[error("unexpected completion `{event}`: no `{category}` effect is in flight")]
    UnexpectedCompletion {
        /// The effect category the completion belongs to.
        category: &'static str,
        /// Stable name of the rejected completion event.
        event: &'static str,
    },
}

impl HandlerError {
    /// Build an [`HandlerError::UnexpectedCompletion`].
    #[must_use]
    pub const fn unexpected_completion(category: &'static str, event: &'static str) -> Self {
        Self::UnexpectedCompletion { category, event }
    }
}

/// Failure of an external operation, delivered inside a completion event.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectError {
    /// The request never produced a response (connection, timeout, DNS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote side answered with a non-success status.
    #[error("remote rejected the request with status {code}")]
    Status {
        /// Status code returned by the remote side.
        code: u16,
    },

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// The analytics mapping could not encode an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot derive analytics record for `{event}`: {reason}")]
pub struct DerivationError {
    /// Stable name of the event that failed to encode.
    pub event: &'static str,
    /// Human readable cause.
    pub reason: String,
}

impl DerivationError {
    /// Create a new derivation error for `event`.
    #[must_use]
    pub fn new(event: &'static str, reason: impl Into<String>) -> Self {
        Self {
            event,
            reason: reason.into(),
        }
    }
}
