//! Pure collection state for one resource kind.
//!
//! # Design
//! - All transitions are synchronous so they can be tested without a runtime.
//! - The visible set is recomputed whenever the query or the collection
//!   changes, and the selection is pruned against it right after.
//! - Load results are applied through a [`LoadTicket`]; a stale ticket leaves
//!   every field untouched.

use std::time::Duration;

use clinic_models::{RecordId, Resource};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::TimeoutPolicy;
use crate::cycle::{CycleLatch, LoadState, LoadTicket, SettleOutcome, Settlement};
use crate::error::LoadFailure;
use crate::filter::{normalize_query, visible_indices};
use crate::normalize::{PayloadShape, normalize_records};
use crate::selection::SelectionSet;

/// Collection, visible subset, selection and load status for one kind.
#[derive(Debug)]
pub struct CollectionState<R> {
    latch: CycleLatch,
    timeout_policy: TimeoutPolicy,
    records: Vec<R>,
    visible: Vec<usize>,
    query: String,
    selection: SelectionSet,
    status: String,
    last_shape: Option<PayloadShape>,
}

impl<R: Resource> CollectionState<R> {
    /// Empty state with the given timeout policy.
    #[must_use]
    pub fn new(timeout_policy: TimeoutPolicy) -> Self {
        Self {
            latch: CycleLatch::default(),
            timeout_policy,
            records: Vec::new(),
            visible: Vec::new(),
            query: String::new(),
            selection: SelectionSet::default(),
            status: String::new(),
            last_shape: None,
        }
    }

    /// Enter `Loading`, superseding any cycle in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        let ticket = self.latch.begin();
        self.status = format!("Loading {}...", R::KIND.plural());
        debug!(kind = %R::KIND, generation = ticket.generation(), "load started");
        ticket
    }

    /// Apply a successful payload.
    pub fn complete(&mut self, ticket: LoadTicket, payload: &Value, elapsed: Duration) -> SettleOutcome {
        if !self.latch.is_current(&ticket) {
            return self.stale(ticket);
        }
        let batch = normalize_records::<R>(payload);
        self.records = batch.records;
        self.last_shape = Some(batch.shape);
        self.refresh_visible();
        self.selection.clear();

        let count = self.records.len();
        let mut status = format!(
            "OK ({} ms) · {count} record{}",
            elapsed.as_millis(),
            if count == 1 { "" } else { "s" }
        );
        if batch.shape == PayloadShape::Unrecognized {
            status.push_str(" · unrecognized payload");
        }
        if batch.skipped > 0 {
            status.push_str(&format!(" · {} skipped", batch.skipped));
        }
        self.status = status;
        info!(
            kind = %R::KIND,
            records = count,
            skipped = batch.skipped,
            shape = batch.shape.label(),
            elapsed_ms = elapsed.as_millis(),
            "load settled"
        );
        self.latch.settle(ticket, Settlement::Success)
    }

    /// Apply a fetch failure. The collection is always emptied.
    pub fn fail(&mut self, ticket: LoadTicket, failure: LoadFailure) -> SettleOutcome {
        if !self.latch.is_current(&ticket) {
            return self.stale(ticket);
        }
        self.clear_records();
        self.status = failure.to_string();
        warn!(kind = %R::KIND, error = %failure, "load failed");
        self.latch.settle(ticket, Settlement::Failure(failure))
    }

    /// Apply a watchdog expiry according to the timeout policy.
    pub fn time_out(&mut self, ticket: LoadTicket, after: Duration) -> SettleOutcome {
        if !self.latch.is_current(&ticket) {
            return self.stale(ticket);
        }
        if self.timeout_policy == TimeoutPolicy::Clear {
            self.clear_records();
        }
        self.status = LoadFailure::Timeout.to_string();
        warn!(
            kind = %R::KIND,
            after_ms = after.as_millis(),
            "watchdog expired before the request settled"
        );
        self.latch.settle(ticket, Settlement::Failure(LoadFailure::Timeout))
    }

    /// Replace the query and recompute the visible set.
    pub fn set_query(&mut self, text: &str) {
        self.query = normalize_query(text);
        self.refresh_visible();
    }

    /// Toggle a visible record. Hidden or unknown ids are ignored.
    pub fn toggle(&mut self, id: &RecordId) -> bool {
        if !self.visible_ids().any(|visible| visible == id) {
            debug!(kind = %R::KIND, id = %id, "ignoring toggle on a record that is not visible");
            return false;
        }
        self.selection.toggle(id)
    }

    /// Select every visible record, or undo that if all are already selected.
    pub fn select_all(&mut self) -> bool {
        let visible: Vec<RecordId> = self.visible_ids().cloned().collect();
        self.selection.toggle_all(&visible)
    }

    /// Deselect everything.
    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selection.contains(id)
    }

    /// Whether every visible selectable record is selected.
    #[must_use]
    pub fn all_visible_selected(&self) -> bool {
        self.selection.covers(self.visible_ids())
    }

    /// Full collection in server order.
    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Records matching the current query, in collection order.
    pub fn visible(&self) -> impl Iterator<Item = &R> {
        self.visible.iter().filter_map(|index| self.records.get(*index))
    }

    /// Identifiers of the visible records that have one.
    pub fn visible_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.visible().filter_map(Resource::id)
    }

    /// Selected records in collection order.
    #[must_use]
    pub fn selected_records(&self) -> Vec<R> {
        self.records
            .iter()
            .filter(|record| record.id().is_some_and(|id| self.selection.contains(id)))
            .cloned()
            .collect()
    }

    /// The selection set.
    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Normalised query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// State of the latest load cycle.
    #[must_use]
    pub const fn load_state(&self) -> &LoadState {
        self.latch.state()
    }

    /// Human-readable status line.
    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status
    }

    /// Envelope matched by the last successful load.
    #[must_use]
    pub const fn last_shape(&self) -> Option<PayloadShape> {
        self.last_shape
    }

    /// Generation of the latest cycle.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.latch.generation()
    }

    fn clear_records(&mut self) {
        self.records.clear();
        self.visible.clear();
        self.selection.clear();
    }

    fn refresh_visible(&mut self) {
        self.visible = visible_indices(&self.records, &self.query);
        let visible: Vec<RecordId> = self.visible_ids().cloned().collect();
        let dropped = self.selection.retain_visible(&visible);
        if dropped > 0 {
            debug!(kind = %R::KIND, dropped, "pruned selections hidden by the filter");
        }
    }

    fn stale(&self, ticket: LoadTicket) -> SettleOutcome {
        let outcome = self.latch.reject(ticket);
        debug!(kind = %R::KIND, ?outcome, "discarding result of a superseded load");
        outcome
    }
}
