//! Selection set over record identifiers.
//!
//! The set itself knows nothing about visibility; callers pass the currently
//! visible identifiers to every operation that depends on them and call
//! [`SelectionSet::retain_visible`] after each filter or load event.

use std::collections::BTreeSet;

use clinic_models::RecordId;

/// Identifiers the user has selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<RecordId>,
    // Selection replaced by the last "select all", restored by the next one.
    before_select_all: Option<BTreeSet<RecordId>>,
}

impl SelectionSet {
    /// Flip membership of `id`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &RecordId) -> bool {
        self.before_select_all = None;
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    /// Select every visible identifier, or undo that when all are already selected.
    ///
    /// Two consecutive calls over the same visible set leave the selection as
    /// it was before the first. Returns whether every visible id is selected
    /// afterwards.
    pub fn toggle_all<'a, I>(&mut self, visible: I) -> bool
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        let visible: BTreeSet<RecordId> = visible.into_iter().cloned().collect();
        if !visible.is_empty() && visible.is_subset(&self.ids) {
            let restored = self.before_select_all.take().unwrap_or_default();
            self.ids.retain(|id| !visible.contains(id) || restored.contains(id));
            false
        } else {
            self.before_select_all = Some(self.ids.clone());
            self.ids.extend(visible.iter().cloned());
            !visible.is_empty()
        }
    }

    /// Drop every identifier not in `visible`. Returns how many were dropped.
    pub fn retain_visible<'a, I>(&mut self, visible: I) -> usize
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        let visible: BTreeSet<&RecordId> = visible.into_iter().collect();
        let before = self.ids.len();
        self.ids.retain(|id| visible.contains(id));
        let dropped = before - self.ids.len();
        if dropped > 0 {
            self.before_select_all = None;
        }
        dropped
    }

    /// Whether every identifier in `visible` is selected (false when none are visible).
    pub fn covers<'a, I>(&self, visible: I) -> bool
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        let mut any = false;
        for id in visible {
            any = true;
            if !self.ids.contains(id) {
                return false;
            }
        }
        any
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.before_select_all = None;
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Number of selected identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The only selected identifier, if exactly one is selected.
    #[must_use]
    pub fn single(&self) -> Option<&RecordId> {
        let mut iter = self.ids.iter();
        match (iter.next(), iter.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

    /// Selected identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordId> {
        self.ids.iter()
    }
}
