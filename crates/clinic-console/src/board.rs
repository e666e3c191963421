//! Treatment board: treatments joined with patient, staff and medicine names.
//!
//! The four lists are fetched concurrently under one aggregate watchdog. A
//! list that fails is replaced by an empty one so the board still renders;
//! unresolved references fall back to the raw identifier.

use std::collections::HashMap;
use std::time::Duration;

use clinic_models::{Medicine, Patient, RecordId, Resource, Staff, Treatment};
use tracing::{info, warn};

use crate::api::ResourceApi;
use crate::cycle::{CycleLatch, LoadState, Settlement};
use crate::error::{GateNotice, LoadFailure};
use crate::gate::Confirm;
use crate::normalize::normalize_records;
use crate::watchdog::{Raced, Watchdog};

/// One rendered board row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentRow {
    /// Treatment identifier.
    pub id: Option<RecordId>,
    /// Treatment date as sent by the server.
    pub date: String,
    /// Resolved patient name.
    pub patient: String,
    /// Resolved staff name.
    pub staff: String,
    /// Resolved medicine name.
    pub medicine: String,
    /// Description.
    pub description: String,
    /// Notes.
    pub notes: String,
}

/// Aggregate treatments view.
#[derive(Debug)]
pub struct TreatmentBoard<A> {
    api: A,
    watchdog: Duration,
    record_watchdog: Duration,
    latch: CycleLatch,
    treatments: Vec<Treatment>,
    patients: HashMap<String, String>,
    staff: HashMap<String, String>,
    medicines: HashMap<String, String>,
    status: String,
}

impl<A: ResourceApi> TreatmentBoard<A> {
    /// Board using `watchdog` for the joined load and `record_watchdog` for deletes.
    pub fn new(api: A, watchdog: Duration, record_watchdog: Duration) -> Self {
        Self {
            api,
            watchdog,
            record_watchdog,
            latch: CycleLatch::default(),
            treatments: Vec::new(),
            patients: HashMap::new(),
            staff: HashMap::new(),
            medicines: HashMap::new(),
            status: String::new(),
        }
    }

    /// Fetch all four lists and rebuild the board.
    ///
    /// On watchdog expiry the previously loaded board is kept.
    pub async fn load(&mut self) -> LoadState {
        let ticket = self.latch.begin();
        self.status = "Loading treatments...".to_string();

        let api = &self.api;
        let raced = Watchdog::arm(self.watchdog)
            .race(async {
                tokio::join!(
                    fetch_or_empty::<Treatment, _>(api),
                    fetch_or_empty::<Patient, _>(api),
                    fetch_or_empty::<Staff, _>(api),
                    fetch_or_empty::<Medicine, _>(api),
                )
            })
            .await;

        let settlement = match raced {
            Raced::Finished {
                output: (treatments, patients, staff, medicines),
                elapsed,
            } => {
                self.patients = names(&patients);
                self.staff = names(&staff);
                self.medicines = names(&medicines);
                self.treatments = treatments;
                self.status = format!("Loaded: {} treatments", self.treatments.len());
                info!(
                    treatments = self.treatments.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "treatment board loaded"
                );
                Settlement::Success
            }
            Raced::Expired { after } => {
                self.status = LoadFailure::Timeout.to_string();
                warn!(after_ms = after.as_millis(), "treatment board timed out");
                Settlement::Failure(LoadFailure::Timeout)
            }
        };
        let _ = self.latch.settle(ticket, settlement);
        self.latch.state().clone()
    }

    /// Delete one treatment after confirmation, then reload.
    ///
    /// # Errors
    ///
    /// [`GateNotice::Cancelled`] if declined, [`GateNotice::Failed`] if the call
    /// fails or times out; the board is untouched in both cases.
    pub async fn delete(
        &mut self,
        id: &RecordId,
        confirm: &dyn Confirm,
    ) -> Result<LoadState, GateNotice> {
        if !confirm.confirm(&format!("Delete treatment {id}?")) {
            return Err(GateNotice::Cancelled);
        }
        let raced = Watchdog::arm(self.record_watchdog)
            .race(self.api.delete(Treatment::KIND, id))
            .await;
        let failure = match raced {
            Raced::Finished { output: Ok(()), .. } => {
                info!(id = %id, "treatment deleted");
                return Ok(self.load().await);
            }
            Raced::Finished {
                output: Err(err), ..
            } => LoadFailure::from(err),
            Raced::Expired { .. } => LoadFailure::Timeout,
        };
        warn!(id = %id, error = %failure, "treatment delete failed");
        Err(GateNotice::Failed {
            action: "delete",
            failure,
        })
    }

    /// Loaded treatments in server order.
    #[must_use]
    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// Rows with resolved names.
    #[must_use]
    pub fn rows(&self) -> Vec<TreatmentRow> {
        self.treatments
            .iter()
            .map(|treatment| TreatmentRow {
                id: treatment.id.clone(),
                date: treatment.date.clone(),
                patient: self.patient_name(&treatment.patient_id).to_string(),
                staff: self.staff_name(&treatment.staff_id).to_string(),
                medicine: self.medicine_name(&treatment.medicine_id).to_string(),
                description: treatment.description.clone(),
                notes: treatment.notes.clone(),
            })
            .collect()
    }

    /// Patient name, or `id` when unknown.
    #[must_use]
    pub fn patient_name<'a>(&'a self, id: &'a str) -> &'a str {
        resolve(&self.patients, id)
    }

    /// Staff name, or `id` when unknown.
    #[must_use]
    pub fn staff_name<'a>(&'a self, id: &'a str) -> &'a str {
        resolve(&self.staff, id)
    }

    /// Medicine name, or `id` when unknown.
    #[must_use]
    pub fn medicine_name<'a>(&'a self, id: &'a str) -> &'a str {
        resolve(&self.medicines, id)
    }

    /// State of the latest load.
    #[must_use]
    pub const fn load_state(&self) -> &LoadState {
        self.latch.state()
    }

    /// Human-readable status line.
    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status
    }
}

async fn fetch_or_empty<R: Resource, A: ResourceApi>(api: &A) -> Vec<R> {
    match api.list(R::KIND, None).await {
        Ok(payload) => normalize_records::<R>(&payload).records,
        Err(err) => {
            warn!(kind = %R::KIND, error = %err, "board list failed; substituting an empty list");
            Vec::new()
        }
    }
}

fn names<R: Resource>(records: &[R]) -> HashMap<String, String> {
    records
        .iter()
        .filter_map(|record| {
            record
                .id()
                .map(|id| (id.as_str().to_string(), record.display_name().into_owned()))
        })
        .collect()
}

fn resolve<'a>(names: &'a HashMap<String, String>, id: &'a str) -> &'a str {
    names.get(id).map_or(id, String::as_str)
}
