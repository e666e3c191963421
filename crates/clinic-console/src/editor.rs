//! Single-record editor backing the create / edit / inspect form.
//!
//! Loads use the single-record watchdog and keep the previous draft on
//! failure or timeout. Saves validate locally before any call is issued.

use clinic_models::{RecordId, Resource};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::ResourceApi;
use crate::config::KindProfile;
use crate::cycle::{CycleLatch, LoadState, Settlement};
use crate::error::{EditorError, LoadFailure};
use crate::watchdog::{Raced, Watchdog};

/// What the form was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    /// Blank form; saving creates a record.
    New,
    /// Existing record; saving replaces it.
    Edit(RecordId),
    /// Existing record, read-only.
    View(RecordId),
}

impl EditorMode {
    /// Record being edited or viewed.
    #[must_use]
    pub const fn id(&self) -> Option<&RecordId> {
        match self {
            Self::New => None,
            Self::Edit(id) | Self::View(id) => Some(id),
        }
    }

    /// Whether saves are refused.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::View(_))
    }
}

/// Form state for one record of kind `R`.
#[derive(Debug)]
pub struct RecordEditor<R, A> {
    api: A,
    profile: KindProfile,
    mode: EditorMode,
    latch: CycleLatch,
    draft: R,
    status: String,
}

impl<R, A> RecordEditor<R, A>
where
    R: Resource + Default,
    A: ResourceApi,
{
    /// Editor with an empty draft.
    pub fn new(api: A, profile: KindProfile, mode: EditorMode) -> Self {
        Self {
            api,
            profile,
            mode,
            latch: CycleLatch::default(),
            draft: R::default(),
            status: String::new(),
        }
    }

    /// Fetch the record named by the mode. `New` editors stay idle.
    pub async fn load(&mut self) -> LoadState {
        let Some(id) = self.mode.id().cloned() else {
            return self.latch.state().clone();
        };
        let ticket = self.latch.begin();
        self.status = format!("Loading {} {id}...", R::KIND.singular());

        let raced = Watchdog::arm(self.profile.record_watchdog)
            .race(self.api.get(R::KIND, &id))
            .await;
        let settlement = match raced {
            Raced::Finished {
                output: Ok(payload),
                elapsed,
            } => match decode::<R>(&payload) {
                Ok(record) => {
                    self.draft = record;
                    self.status = format!("OK ({} ms)", elapsed.as_millis());
                    debug!(kind = %R::KIND, id = %id, "record loaded");
                    Settlement::Success
                }
                Err(failure) => self.failed(failure),
            },
            Raced::Finished {
                output: Err(err), ..
            } => self.failed(LoadFailure::from(err)),
            Raced::Expired { .. } => self.failed(LoadFailure::Timeout),
        };
        let _ = self.latch.settle(ticket, settlement);
        self.latch.state().clone()
    }

    /// Validate and persist the draft. Returns the record as stored by the server.
    ///
    /// # Errors
    ///
    /// [`EditorError::ReadOnly`] in view mode, [`EditorError::MissingField`]
    /// for a blank required field, [`EditorError::Save`] when the call fails
    /// or the watchdog expires.
    pub async fn save(&mut self) -> Result<R, EditorError> {
        if self.mode.is_read_only() {
            return Err(EditorError::ReadOnly);
        }
        if let Some(field) = self.draft.missing_required_field() {
            return Err(EditorError::MissingField { field });
        }
        let body = serde_json::to_value(&self.draft).map_err(|err| {
            EditorError::Save(LoadFailure::Unknown {
                message: err.to_string(),
            })
        })?;

        let watchdog = Watchdog::arm(self.profile.record_watchdog);
        let raced = match &self.mode {
            EditorMode::Edit(id) => watchdog.race(self.api.update(R::KIND, id, &body)).await,
            EditorMode::New | EditorMode::View(_) => {
                watchdog.race(self.api.create(R::KIND, &body)).await
            }
        };
        let failure = match raced {
            Raced::Finished {
                output: Ok(payload),
                ..
            } => {
                let saved = self.stored_record(&payload);
                if let Some(id) = saved.id().cloned()
                    && self.mode == EditorMode::New
                {
                    self.mode = EditorMode::Edit(id);
                }
                self.status = format!("Saved {}.", R::KIND.singular());
                info!(kind = %R::KIND, "record saved");
                self.draft = saved.clone();
                return Ok(saved);
            }
            Raced::Finished {
                output: Err(err), ..
            } => LoadFailure::from(err),
            Raced::Expired { .. } => LoadFailure::Timeout,
        };
        self.status = failure.to_string();
        warn!(kind = %R::KIND, error = %failure, "save failed");
        Err(EditorError::Save(failure))
    }

    /// Current draft.
    #[must_use]
    pub const fn draft(&self) -> &R {
        &self.draft
    }

    /// Mutable draft for form input.
    pub const fn draft_mut(&mut self) -> &mut R {
        &mut self.draft
    }

    /// Replace the draft wholesale.
    pub fn set_draft(&mut self, draft: R) {
        self.draft = draft;
    }

    /// Mode the editor was opened in (`New` switches to `Edit` after the first save).
    #[must_use]
    pub const fn mode(&self) -> &EditorMode {
        &self.mode
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

    /// The server's copy of the saved record, or the local draft when the
    /// reply is empty, an acknowledgement, or names a different record.
    fn stored_record(&self, payload: &Value) -> R {
        let Ok(stored) = decode::<R>(payload) else {
            return self.draft.clone();
        };
        let accepted = match (&self.mode, stored.id()) {
            (_, None) => false,
            (EditorMode::Edit(edited), Some(id)) => id == edited,
            (EditorMode::New | EditorMode::View(_), Some(_)) => true,
        };
        if accepted {
            stored
        } else {
            debug!(kind = %R::KIND, "save reply is not a stored record; keeping draft");
            self.draft.clone()
        }
    }

    fn failed(&mut self, failure: LoadFailure) -> Settlement {
        self.status = failure.to_string();
        warn!(kind = %R::KIND, error = %failure, "record load failed; keeping previous draft");
        Settlement::Failure(failure)
    }
}

fn decode<R: Resource>(payload: &Value) -> Result<R, LoadFailure> {
    R::deserialize(payload).map_err(|err| LoadFailure::Unknown {
        message: format!("unexpected {} payload: {err}", R::KIND.singular()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use clinic_models::{Patient, ResourceKind};
    use serde_json::json;

    use crate::error::FetchError;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        update_reply: Value,
    }

    impl Recorder {
        fn replying_to_updates(reply: Value) -> Self {
            Self {
                update_reply: reply,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ResourceApi for Recorder {
        async fn list(&self, _: ResourceKind, _: Option<&str>) -> Result<Value, FetchError> {
            Ok(json!([]))
        }

        async fn get(&self, _: ResourceKind, id: &RecordId) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push(format!("get {id}"));
            if id.as_str() == "slow" {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
            Ok(json!({"id": id, "name": "Ana", "age": 28}))
        }

        async fn create(&self, _: ResourceKind, body: &Value) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push(format!("create {body}"));
            let mut created = body.clone();
            created["id"] = json!("new-1");
            Ok(created)
        }

        async fn update(
            &self,
            _: ResourceKind,
            id: &RecordId,
            _: &Value,
        ) -> Result<Value, FetchError> {
            self.calls.lock().unwrap().push(format!("update {id}"));
            Ok(self.update_reply.clone())
        }

        async fn delete(&self, _: ResourceKind, _: &RecordId) -> Result<(), FetchError> {
            Ok(())
        }

        async fn delete_many(&self, _: ResourceKind, _: &[RecordId]) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn profile() -> KindProfile {
        KindProfile::list_view(ResourceKind::Patients)
    }

    #[tokio::test]
    async fn new_records_validate_then_create() {
        let mut editor = RecordEditor::<Patient, _>::new(Recorder::default(), profile(), EditorMode::New);
        assert_eq!(
            editor.save().await,
            Err(EditorError::MissingField { field: "name" })
        );
        assert!(editor.api.calls.lock().unwrap().is_empty());

        editor.draft_mut().name = "Luis".into();
        let saved = editor.save().await.expect("save");
        assert_eq!(saved.id, Some(RecordId::new("new-1")));
        assert_eq!(editor.mode(), &EditorMode::Edit(RecordId::new("new-1")));
    }

    #[tokio::test]
    async fn edit_mode_loads_and_updates() {
        let mut editor = RecordEditor::<Patient, _>::new(
            Recorder::default(),
            profile(),
            EditorMode::Edit(RecordId::new("p1")),
        );
        assert!(editor.load().await.is_success());
        assert_eq!(editor.draft().name, "Ana");

        editor.draft_mut().age = Some(29);
        let saved = editor.save().await.expect("save");
        assert_eq!(saved.age, Some(29));
        assert_eq!(
            *editor.api.calls.lock().unwrap(),
            vec!["get p1".to_string(), "update p1".to_string()]
        );
    }

    #[tokio::test]
    async fn acknowledgement_replies_keep_the_draft() {
        for reply in [
            json!({"status": "ok"}),
            json!({"id": "p2", "name": "Someone else"}),
        ] {
            let mut editor = RecordEditor::<Patient, _>::new(
                Recorder::replying_to_updates(reply),
                profile(),
                EditorMode::Edit(RecordId::new("p1")),
            );
            editor.set_draft(Patient {
                id: Some(RecordId::new("p1")),
                name: "Ana".into(),
                ..Patient::default()
            });

            let saved = editor.save().await.expect("save");
            assert_eq!(saved.id, Some(RecordId::new("p1")));
            assert_eq!(saved.name, "Ana");
            assert_eq!(editor.draft().name, "Ana");
            assert_eq!(editor.mode(), &EditorMode::Edit(RecordId::new("p1")));
        }
    }

    #[tokio::test]
    async fn stored_copy_of_the_edited_record_replaces_the_draft() {
        let mut editor = RecordEditor::<Patient, _>::new(
            Recorder::replying_to_updates(json!({"id": "p1", "name": "Ana Maria"})),
            profile(),
            EditorMode::Edit(RecordId::new("p1")),
        );
        editor.set_draft(Patient {
            id: Some(RecordId::new("p1")),
            name: "Ana".into(),
            ..Patient::default()
        });

        let saved = editor.save().await.expect("save");
        assert_eq!(saved.name, "Ana Maria");
        assert_eq!(editor.draft().name, "Ana Maria");
    }

    #[tokio::test]
    async fn view_mode_refuses_saves() {
        let mut editor = RecordEditor::<Patient, _>::new(
            Recorder::default(),
            profile(),
            EditorMode::View(RecordId::new("p1")),
        );
        editor.load().await;
        assert_eq!(editor.save().await, Err(EditorError::ReadOnly));
    }

    #[tokio::test(start_paused = true)]
    async fn load_timeout_keeps_previous_draft() {
        let mut editor = RecordEditor::<Patient, _>::new(
            Recorder::default(),
            profile(),
            EditorMode::Edit(RecordId::new("slow")),
        );
        editor.set_draft(Patient {
            name: "Kept".into(),
            ..Patient::default()
        });
        let state = editor.load().await;
        assert_eq!(state.failure(), Some(&LoadFailure::Timeout));
        assert_eq!(editor.draft().name, "Kept");
        assert_eq!(
            editor.status_line(),
            "Timeout: the request returned no usable response."
        );
    }
}
