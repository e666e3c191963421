//! Bulk action gate: selection-count preconditions, confirmations and
//! reload-after-mutation.
//!
//! Refusals are returned as [`GateNotice`] values. A refused action never
//! reaches the API.

use std::fmt::{self, Display, Formatter};

use clinic_models::{RecordId, Resource, ResourceKind};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::ResourceApi;
use crate::controller::CollectionController;
use crate::cycle::LoadState;
use crate::error::{FetchError, GateNotice, LoadFailure};
use crate::selection::SelectionSet;
use crate::watchdog::{Raced, Watchdog};

/// Interactive confirmation for destructive actions.
pub trait Confirm {
    /// Ask the user; `true` means proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Where an edit or inspect action should navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Open the editor for the record.
    Edit(RecordId),
    /// Open the record read-only.
    Inspect(RecordId),
}

impl Dispatch {
    /// Target record.
    #[must_use]
    pub const fn id(&self) -> &RecordId {
        match self {
            Self::Edit(id) | Self::Inspect(id) => id,
        }
    }

    /// Route of the form view for `kind`.
    #[must_use]
    pub fn route(&self, kind: ResourceKind) -> String {
        match self {
            Self::Edit(id) => format!("/{}/edit/{id}", kind.path_segment()),
            Self::Inspect(id) => format!("/{}/edit/{id}?mode=view", kind.path_segment()),
        }
    }
}

impl Display for Dispatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edit(id) => write!(f, "edit {id}"),
            Self::Inspect(id) => write!(f, "inspect {id}"),
        }
    }
}

/// Require exactly one selected identifier.
///
/// # Errors
///
/// [`GateNotice::RequiresExactlyOne`] otherwise.
pub fn require_one(
    selection: &SelectionSet,
    kind: ResourceKind,
    action: &'static str,
) -> Result<RecordId, GateNotice> {
    selection
        .single()
        .cloned()
        .ok_or(GateNotice::RequiresExactlyOne {
            kind: kind.singular(),
            action,
            selected: selection.len(),
        })
}

/// Require at least one selected identifier.
///
/// # Errors
///
/// [`GateNotice::RequiresAtLeastOne`] otherwise.
pub fn require_any(
    selection: &SelectionSet,
    kind: ResourceKind,
    action: &'static str,
) -> Result<Vec<RecordId>, GateNotice> {
    if selection.is_empty() {
        return Err(GateNotice::RequiresAtLeastOne {
            kind: kind.singular(),
            action,
        });
    }
    Ok(selection.iter().cloned().collect())
}

impl<R: Resource, A: ResourceApi> CollectionController<R, A> {
    /// Dispatch the editor for the single selected record.
    ///
    /// # Errors
    ///
    /// Refused unless exactly one record is selected.
    pub fn edit_selected(&self) -> Result<Dispatch, GateNotice> {
        require_one(self.state.borrow().selection(), R::KIND, "edit").map(Dispatch::Edit)
    }

    /// Dispatch a read-only view of the single selected record.
    ///
    /// # Errors
    ///
    /// Refused unless exactly one record is selected.
    pub fn inspect_selected(&self) -> Result<Dispatch, GateNotice> {
        require_one(self.state.borrow().selection(), R::KIND, "inspect").map(Dispatch::Inspect)
    }

    /// Selected records, in collection order.
    ///
    /// # Errors
    ///
    /// Refused when nothing is selected.
    pub fn view_selected(&self) -> Result<Vec<R>, GateNotice> {
        let state = self.state.borrow();
        require_any(state.selection(), R::KIND, "view")?;
        Ok(state.selected_records())
    }

    /// Delete one record after confirmation, then reload.
    ///
    /// # Errors
    ///
    /// [`GateNotice::Cancelled`] if declined, [`GateNotice::Failed`] if the
    /// call fails; state is untouched in both cases.
    pub async fn delete_one(
        &self,
        id: &RecordId,
        confirm: &dyn Confirm,
    ) -> Result<LoadState, GateNotice> {
        let prompt = format!("Delete {} {id}?", R::KIND.singular());
        if !confirm.confirm(&prompt) {
            return Err(GateNotice::Cancelled);
        }
        self.mutate("delete", self.api.delete(R::KIND, id)).await?;
        info!(kind = %R::KIND, id = %id, "record deleted");
        Ok(self.load().await)
    }

    /// Delete every selected record in one bulk call after confirmation, then reload.
    ///
    /// # Errors
    ///
    /// Refused when nothing is selected; otherwise as [`Self::delete_one`].
    pub async fn delete_selected(&self, confirm: &dyn Confirm) -> Result<LoadState, GateNotice> {
        let ids = require_any(self.state.borrow().selection(), R::KIND, "delete")?;
        let prompt = format!(
            "Delete {} selected {}?",
            ids.len(),
            if ids.len() == 1 {
                R::KIND.singular()
            } else {
                R::KIND.plural()
            }
        );
        if !confirm.confirm(&prompt) {
            return Err(GateNotice::Cancelled);
        }
        self.mutate("delete", self.api.delete_many(R::KIND, &ids))
            .await?;
        info!(kind = %R::KIND, count = ids.len(), "records deleted");
        Ok(self.load().await)
    }

    /// Create a record, then reload.
    ///
    /// # Errors
    ///
    /// [`GateNotice::Failed`] if the call fails.
    pub async fn create(&self, record: &R) -> Result<LoadState, GateNotice> {
        let body = encode(record, "create")?;
        self.mutate("create", self.api.create(R::KIND, &body))
            .await?;
        info!(kind = %R::KIND, "record created");
        Ok(self.load().await)
    }

    /// Replace a record, then reload.
    ///
    /// # Errors
    ///
    /// [`GateNotice::Failed`] if the call fails.
    pub async fn update(&self, id: &RecordId, record: &R) -> Result<LoadState, GateNotice> {
        let body = encode(record, "update")?;
        self.mutate("update", self.api.update(R::KIND, id, &body))
            .await?;
        info!(kind = %R::KIND, id = %id, "record updated");
        Ok(self.load().await)
    }

    async fn mutate<T, F>(&self, action: &'static str, call: F) -> Result<T, GateNotice>
    where
        F: Future<Output = Result<T, FetchError>>,
    {
        let failure = match Watchdog::arm(self.profile.record_watchdog).race(call).await {
            Raced::Finished {
                output: Ok(output), ..
            } => return Ok(output),
            Raced::Finished {
                output: Err(err), ..
            } => LoadFailure::from(err),
            Raced::Expired { .. } => LoadFailure::Timeout,
        };
        warn!(kind = %R::KIND, action, error = %failure, "mutation failed");
        Err(GateNotice::Failed { action, failure })
    }
}

fn encode<R: Resource>(record: &R, action: &'static str) -> Result<Value, GateNotice> {
    serde_json::to_value(record).map_err(|err| GateNotice::Failed {
        action,
        failure: LoadFailure::Unknown {
            message: format!("could not encode {}: {err}", R::KIND.singular()),
        },
    })
}
