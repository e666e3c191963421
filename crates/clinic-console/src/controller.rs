//! Async collection controller: one generic list view for every resource kind.
//!
//! # Design
//! - State lives in a `RefCell` and is never borrowed across an `.await`, so
//!   overlapping `load()` calls on one task interleave safely and the older
//!   one settles as a no-op.
//! - The fetch is raced against a [`Watchdog`]; whichever finishes first
//!   settles the cycle and the loser is dropped.
//! - Methods take `&self`; the controller is driven from a single task.

use std::cell::{Ref, RefCell};

use clinic_models::{RecordId, Resource, ResourceKind};
use tracing::debug;

use crate::api::ResourceApi;
use crate::collection::CollectionState;
use crate::config::KindProfile;
use crate::cycle::{LoadState, SettleOutcome};
use crate::error::LoadFailure;
use crate::watchdog::{Raced, Watchdog};

/// Loads, filters and selects the records of one kind.
#[derive(Debug)]
pub struct CollectionController<R, A> {
    pub(crate) api: A,
    pub(crate) profile: KindProfile,
    server_query: RefCell<Option<String>>,
    pub(crate) state: RefCell<CollectionState<R>>,
}

impl<R: Resource, A: ResourceApi> CollectionController<R, A> {
    /// Controller for `R` using `profile`'s watchdog and timeout policy.
    pub fn new(api: A, profile: KindProfile) -> Self {
        Self {
            api,
            profile,
            server_query: RefCell::new(None),
            state: RefCell::new(CollectionState::new(profile.timeout_policy)),
        }
    }

    /// Run one load cycle and return the state it left behind.
    ///
    /// If another `load()` starts before this one settles, this cycle's result
    /// is discarded and the returned state reflects the newer cycle.
    pub async fn load(&self) -> LoadState {
        let ticket = self.state.borrow_mut().begin_load();
        let server_query = self.server_query.borrow().clone();

        let watchdog = Watchdog::arm(self.profile.list_watchdog);
        let raced = watchdog
            .race(self.api.list(R::KIND, server_query.as_deref()))
            .await;

        let mut state = self.state.borrow_mut();
        let outcome = match raced {
            Raced::Finished {
                output: Ok(payload),
                elapsed,
            } => state.complete(ticket, &payload, elapsed),
            Raced::Finished {
                output: Err(err), ..
            } => state.fail(ticket, LoadFailure::from(err)),
            Raced::Expired { after } => state.time_out(ticket, after),
        };
        if let SettleOutcome::Stale { ticket, current } = outcome {
            debug!(kind = %R::KIND, ticket, current, "load superseded");
        }
        state.load_state().clone()
    }

    /// Clear the query and reload.
    pub async fn refresh(&self) -> LoadState {
        self.state.borrow_mut().set_query("");
        self.load().await
    }

    /// Server-side `q` filter sent with subsequent loads.
    pub fn set_server_query(&self, query: Option<String>) {
        *self.server_query.borrow_mut() = query.filter(|query| !query.trim().is_empty());
    }

    /// Replace the client-side query.
    pub fn set_query(&self, text: &str) {
        self.state.borrow_mut().set_query(text);
    }

    /// Toggle a visible record; returns whether it is selected afterwards.
    pub fn toggle(&self, id: &RecordId) -> bool {
        self.state.borrow_mut().toggle(id)
    }

    /// Select all visible records, or undo that when all are selected.
    pub fn select_all(&self) -> bool {
        self.state.borrow_mut().select_all()
    }

    /// Clear the selection.
    pub fn deselect_all(&self) {
        self.state.borrow_mut().deselect_all();
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.state.borrow().is_selected(id)
    }

    /// Whether every visible selectable record is selected.
    #[must_use]
    pub fn all_visible_selected(&self) -> bool {
        self.state.borrow().all_visible_selected()
    }

    /// Snapshot of the visible records.
    #[must_use]
    pub fn visible(&self) -> Vec<R> {
        self.state.borrow().visible().cloned().collect()
    }

    /// Snapshot of the full collection.
    #[must_use]
    pub fn records(&self) -> Vec<R> {
        self.state.borrow().records().to_vec()
    }

    /// Selected identifiers.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.state.borrow().selection().iter().cloned().collect()
    }

    /// State of the latest load cycle.
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.state.borrow().load_state().clone()
    }

    /// Human-readable status line.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.state.borrow().status_line().to_string()
    }

    /// Current normalised query.
    #[must_use]
    pub fn query(&self) -> String {
        self.state.borrow().query().to_string()
    }

    /// Borrow the full state for rendering. Do not hold across an `.await`.
    #[must_use]
    pub fn state(&self) -> Ref<'_, CollectionState<R>> {
        self.state.borrow()
    }

    /// Kind served by this controller.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        R::KIND
    }

    /// Underlying API.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Active profile.
    #[must_use]
    pub const fn profile(&self) -> &KindProfile {
        &self.profile
    }
}
