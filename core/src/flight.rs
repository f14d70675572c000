//! In-flight indicator for one effect category.
//!
//! Each category of effectful work (loading a profile, saving it, ...) runs
//! the same machine:
//!
//! ```text
//! Idle --begin--> InFlight(t) --land(t)--> Idle
//! Idle --land(_)--> Err(UnexpectedCompletion), stays Idle
//! InFlight(t) --land(u != t)--> Err(UnexpectedCompletion), stays InFlight(t)
//! InFlight(t) --begin--> InFlight(t) (trigger ignored)
//! any --abort--> Idle
//! ```
//!
//! `begin` hands out a [`Ticket`]. The effect carries it and the completion
//! echoes it back, so `land` can tell the outstanding effect from one that was
//! abandoned (the view went away) and later superseded by a newer request.

use crate::error::HandlerError;
use serde::{Deserialize, Serialize};

/// Identifies one `begin` of a [`Flight`].
///
/// Tickets of a flight are issued in order starting at 1 and are never
/// reused, even across [`Flight::abort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Ticket {
    /// Ticket with the given issue number
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Issue number of this ticket
    #[must_use]
    pub const fn number(self) -> u64 {
        self.0
    }
}

/// Whether an effect of a given category is outstanding, and which one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flight {
    issued: u64,
    outstanding: Option<Ticket>,
}

impl Flight {
    /// Mark the category as in flight.
    ///
    /// Returns the ticket the effect must carry on the `Idle → InFlight`
    /// transition. Returns `None` and leaves the flight untouched when an
    /// effect is already outstanding; callers request no new effect then.
    #[must_use = "`None` means no effect should be requested"]
    pub fn begin(&mut self) -> Option<Ticket> {
        if self.outstanding.is_some() {
            return None;
        }
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.outstanding = Some(ticket);
        Some(ticket)
    }

    /// Accept the completion carrying `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::UnexpectedCompletion`] when nothing is in
    /// flight or when `ticket` is not the outstanding one. The flight is left
    /// as it was.
    pub fn land(
        &mut self,
        ticket: Ticket,
        category: &'static str,
        event: &'static str,
    ) -> Result<(), HandlerError> {
        if self.outstanding == Some(ticket) {
            self.outstanding = None;
            Ok(())
        } else {
            Err(HandlerError::unexpected_completion(category, event))
        }
    }

    /// Abandon the outstanding effect, if any.
    ///
    /// Its completion is rejected by [`land`](Self::land) from now on, also
    /// after a later `begin`.
    pub fn abort(&mut self) {
        self.outstanding = None;
    }

    /// Returns `true` while an effect is outstanding.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        self.outstanding.is_some()
    }

    /// Ticket of the outstanding effect
    #[must_use]
    pub const fn ticket(self) -> Option<Ticket> {
        self.outstanding
    }
}
