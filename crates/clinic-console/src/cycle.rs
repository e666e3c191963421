//! Load-cycle bookkeeping shared by list, editor and board controllers.
//!
//! # Design
//! - Every load starts by calling [`CycleLatch::begin`], which bumps the
//!   generation and hands out a [`LoadTicket`].
//! - A ticket is not `Clone`; settling consumes it, so each cycle settles at
//!   most once.
//! - A ticket from an older generation is rejected without touching state,
//!   which is how superseded responses are discarded.

use std::fmt::{self, Display, Formatter};

use crate::error::LoadFailure;

/// Observable state of the most recent load cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    /// No load has been started.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The most recent request settled.
    Settled(Settlement),
}

impl LoadState {
    /// True while a request is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// True once the latest cycle settled successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Settled(Settlement::Success))
    }

    /// Failure of the latest cycle, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&LoadFailure> {
        match self {
            Self::Settled(Settlement::Failure(failure)) => Some(failure),
            _ => None,
        }
    }
}

impl Display for LoadState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Settled(Settlement::Success) => f.write_str("success"),
            Self::Settled(Settlement::Failure(failure)) => write!(f, "failed: {failure}"),
        }
    }
}

/// Terminal outcome of a load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Data was received and applied.
    Success,
    /// The request failed or timed out.
    Failure(LoadFailure),
}

/// Proof of a started load cycle. Consumed when the cycle settles.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a load ticket must be settled or the cycle stays in Loading"]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    /// Generation this ticket belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Whether a settlement was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The ticket was current and its result is now visible.
    Applied,
    /// A newer cycle superseded the ticket, or it was already settled.
    Stale {
        /// Generation of the rejected ticket.
        ticket: u64,
        /// Generation currently in flight or last settled.
        current: u64,
    },
}

impl SettleOutcome {
    /// True if the settlement changed state.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Generation counter plus the state of the latest cycle.
#[derive(Debug, Default)]
pub struct CycleLatch {
    generation: u64,
    state: LoadState,
}

impl CycleLatch {
    /// Start a new cycle, superseding any cycle still in flight.
    pub fn begin(&mut self) -> LoadTicket {
        self.generation = self.generation.wrapping_add(1);
        self.state = LoadState::Loading;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Whether `ticket` may still settle.
    #[must_use]
    pub const fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.state.is_loading()
    }

    /// Settle the cycle `ticket` belongs to.
    pub fn settle(&mut self, ticket: LoadTicket, settlement: Settlement) -> SettleOutcome {
        if !self.is_current(&ticket) {
            return self.reject(ticket);
        }
        self.state = LoadState::Settled(settlement);
        SettleOutcome::Applied
    }

    /// Drop a ticket that lost the race without touching state.
    #[allow(clippy::needless_pass_by_value)]
    pub fn reject(&self, ticket: LoadTicket) -> SettleOutcome {
        SettleOutcome::Stale {
            ticket: ticket.generation,
            current: self.generation,
        }
    }

    /// Current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// State of the latest cycle.
    #[must_use]
    pub const fn state(&self) -> &LoadState {
        &self.state
    }
}
