//! Controller behaviour against a scripted in-memory API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clinic_console::{
    CollectionController, Dispatch, FetchError, GateNotice, KindProfile, LoadFailure, LoadState,
    ResourceApi, TimeoutPolicy,
};
use clinic_models::{Patient, RecordId, ResourceKind, Staff};
use serde_json::{Value, json};

#[derive(Default)]
struct Script {
    rows: Vec<Value>,
    // Per-call overrides for `list`: delay, then an optional replacement result.
    list_plan: VecDeque<(Duration, Option<Result<Value, FetchError>>)>,
    fail_mutations: bool,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
struct FakeClinic {
    script: Arc<Mutex<Script>>,
}

impl FakeClinic {
    fn with_rows(rows: Vec<Value>) -> Self {
        let fake = Self::default();
        fake.script.lock().unwrap().rows = rows;
        fake
    }

    fn plan_list(&self, delay: Duration, result: Option<Result<Value, FetchError>>) {
        self.script
            .lock()
            .unwrap()
            .list_plan
            .push_back((delay, result));
    }

    fn fail_mutations(&self) {
        self.script.lock().unwrap().fail_mutations = true;
    }

    fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn mutation(&self, call: String) -> Result<(), FetchError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        if script.fail_mutations {
            return Err(FetchError::Status {
                status: 500,
                url: "http://clinic/api".into(),
                message: "Internal Server Error".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceApi for FakeClinic {
    async fn list(&self, kind: ResourceKind, query: Option<&str>) -> Result<Value, FetchError> {
        let (delay, result) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(match query {
                Some(query) => format!("list {kind} q={query}"),
                None => format!("list {kind}"),
            });
            let (delay, planned) = script.list_plan.pop_front().unwrap_or_default();
            let result = planned.unwrap_or_else(|| Ok(Value::Array(script.rows.clone())));
            (delay, result)
        };
        tokio::time::sleep(delay).await;
        result
    }

    async fn get(&self, _: ResourceKind, _: &RecordId) -> Result<Value, FetchError> {
        Ok(Value::Null)
    }

    async fn create(&self, kind: ResourceKind, body: &Value) -> Result<Value, FetchError> {
        self.mutation(format!("create {kind}"))?;
        let mut created = body.clone();
        created["id"] = json!("created");
        self.script.lock().unwrap().rows.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        _: &Value,
    ) -> Result<Value, FetchError> {
        self.mutation(format!("update {kind} {id}"))?;
        Ok(Value::Null)
    }

    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), FetchError> {
        self.mutation(format!("delete {kind} {id}"))?;
        self.script
            .lock()
            .unwrap()
            .rows
            .retain(|row| row["id"] != id.as_str());
        Ok(())
    }

    async fn delete_many(&self, kind: ResourceKind, ids: &[RecordId]) -> Result<(), FetchError> {
        let joined: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
        self.mutation(format!("delete_many {kind} {}", joined.join(",")))?;
        self.script
            .lock()
            .unwrap()
            .rows
            .retain(|row| !joined.iter().any(|id| row["id"] == *id));
        Ok(())
    }
}

fn patients(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"id": format!("p{i}"), "name": format!("Patient {i}"), "age": 20 + i}))
        .collect()
}

fn controller(fake: &FakeClinic) -> CollectionController<Patient, FakeClinic> {
    CollectionController::new(fake.clone(), KindProfile::list_view(ResourceKind::Patients))
}

fn accept(_: &str) -> bool {
    true
}

fn decline(_: &str) -> bool {
    false
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_loses_to_the_watchdog() {
    let fake = FakeClinic::with_rows(patients(3));
    fake.plan_list(Duration::from_millis(6_000), None);
    let controller = CollectionController::<Patient, _>::new(
        fake.clone(),
        KindProfile::list_view(ResourceKind::Patients)
            .with_list_watchdog(Duration::from_millis(5_000)),
    );

    let started = tokio::time::Instant::now();
    let state = controller.load().await;
    assert_eq!(started.elapsed(), Duration::from_millis(5_000));
    assert_eq!(state.failure(), Some(&LoadFailure::Timeout));
    assert_eq!(
        controller.status_line(),
        "Timeout: the request returned no usable response."
    );

    tokio::time::advance(Duration::from_millis(2_000)).await;
    assert!(controller.records().is_empty());
    assert_eq!(controller.load_state(), state);
}

#[tokio::test(start_paused = true)]
async fn list_timeout_clears_previous_records() {
    let fake = FakeClinic::with_rows(patients(4));
    let controller = controller(&fake);
    assert!(controller.load().await.is_success());
    assert_eq!(controller.records().len(), 4);

    fake.plan_list(Duration::from_secs(60), None);
    controller.load().await;
    assert!(controller.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn preserve_policy_keeps_records_on_timeout() {
    let fake = FakeClinic::with_rows(patients(4));
    let controller = CollectionController::<Patient, _>::new(
        fake.clone(),
        KindProfile::list_view(ResourceKind::Patients).with_timeout_policy(TimeoutPolicy::Preserve),
    );
    controller.load().await;
    fake.plan_list(Duration::from_secs(60), None);
    let state = controller.load().await;
    assert_eq!(state.failure(), Some(&LoadFailure::Timeout));
    assert_eq!(controller.records().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn newer_load_supersedes_an_older_one() {
    let fake = FakeClinic::default();
    fake.plan_list(
        Duration::from_millis(100),
        Some(Ok(json!([{"id": "old", "name": "Stale"}]))),
    );
    fake.plan_list(
        Duration::from_millis(20),
        Some(Ok(json!([{"id": "new", "name": "Fresh"}]))),
    );
    let controller = controller(&fake);

    let (first, second) = tokio::join!(controller.load(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.load().await
    });

    assert!(first.is_success());
    assert!(second.is_success());
    let names: Vec<_> = controller.records().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["Fresh"]);
    assert_eq!(controller.state().generation(), 2);
}

#[tokio::test]
async fn content_envelope_loads_records() {
    let fake = FakeClinic::default();
    fake.plan_list(
        Duration::ZERO,
        Some(Ok(json!({"content": [
            {"id": "a", "name": "Ana"},
            {"id": "b", "name": "Bruno"},
            {"id": "c", "name": "Carla"}
        ], "totalElements": 3}))),
    );
    let controller = controller(&fake);
    assert!(controller.load().await.is_success());
    assert_eq!(controller.records().len(), 3);
    assert!(controller.status_line().ends_with("· 3 records"));
}

#[tokio::test]
async fn network_failure_reports_status_zero() {
    let fake = FakeClinic::with_rows(patients(2));
    let controller = controller(&fake);
    controller.load().await;

    fake.plan_list(
        Duration::ZERO,
        Some(Err(FetchError::Network {
            message: "connection refused".into(),
        })),
    );
    let state = controller.load().await;
    assert_eq!(state.failure().and_then(LoadFailure::status_code), Some(0));
    assert!(controller.records().is_empty());
    assert!(controller.status_line().starts_with("Network/CORS error (status 0)"));
}

#[tokio::test]
async fn http_failure_reports_status_code() {
    let fake = FakeClinic::default();
    fake.plan_list(
        Duration::ZERO,
        Some(Err(FetchError::Status {
            status: 502,
            url: "http://clinic/api/staff".into(),
            message: "Bad Gateway".into(),
        })),
    );
    let controller =
        CollectionController::<Staff, _>::new(fake, KindProfile::list_view(ResourceKind::Staff));
    let state = controller.load().await;
    assert_eq!(state.failure().and_then(LoadFailure::status_code), Some(502));
    assert!(controller.status_line().contains("HTTP error 502"));
}

#[tokio::test]
async fn numeric_query_matches_age() {
    let fake = FakeClinic::with_rows(patients(30));
    let controller = controller(&fake);
    controller.load().await;
    controller.set_query("45");
    let names: Vec<_> = controller.visible().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["Patient 25"]);
}

#[tokio::test]
async fn filtering_prunes_hidden_selections() {
    let fake = FakeClinic::with_rows(vec![
        json!({"id": "a", "name": "Ana"}),
        json!({"id": "b", "name": "Bruno"}),
        json!({"id": "c", "name": "Carla"}),
        json!({"id": "d", "name": "Dario"}),
        json!({"id": "e", "name": "Elena"}),
    ]);
    let controller = controller(&fake);
    controller.load().await;
    controller.toggle(&RecordId::new("a"));
    controller.toggle(&RecordId::new("c"));

    controller.set_query("CARLA");
    assert_eq!(controller.selected_ids(), vec![RecordId::new("c")]);

    controller.set_query("");
    assert_eq!(controller.selected_ids().len(), 1);
}

#[tokio::test]
async fn select_all_twice_restores_selection() {
    let fake = FakeClinic::with_rows(patients(4));
    let controller = controller(&fake);
    controller.load().await;
    controller.toggle(&RecordId::new("p2"));
    let before = controller.selected_ids();

    assert!(controller.select_all());
    assert!(controller.all_visible_selected());
    assert!(!controller.select_all());
    assert_eq!(controller.selected_ids(), before);
}

#[tokio::test]
async fn gate_refusals_issue_no_calls() {
    let fake = FakeClinic::with_rows(patients(3));
    let controller = controller(&fake);
    controller.load().await;
    let baseline = fake.calls();

    assert!(matches!(
        controller.edit_selected(),
        Err(GateNotice::RequiresExactlyOne { selected: 0, .. })
    ));
    assert!(controller.view_selected().is_err());
    assert!(matches!(
        controller.delete_selected(&accept).await,
        Err(GateNotice::RequiresAtLeastOne { .. })
    ));

    controller.toggle(&RecordId::new("p0"));
    controller.toggle(&RecordId::new("p1"));
    assert!(matches!(
        controller.inspect_selected(),
        Err(GateNotice::RequiresExactlyOne { selected: 2, .. })
    ));
    assert_eq!(fake.calls(), baseline);
}

#[tokio::test]
async fn single_selection_dispatches_edit_and_inspect() {
    let fake = FakeClinic::with_rows(patients(3));
    let controller = controller(&fake);
    controller.load().await;
    controller.toggle(&RecordId::new("p1"));

    let edit = controller.edit_selected().expect("edit");
    assert_eq!(edit, Dispatch::Edit(RecordId::new("p1")));
    assert_eq!(edit.route(ResourceKind::Patients), "/patients/edit/p1");
    assert_eq!(
        controller.inspect_selected().expect("inspect"),
        Dispatch::Inspect(RecordId::new("p1"))
    );
    let viewed = controller.view_selected().expect("view");
    assert_eq!(viewed[0].name, "Patient 1");
}

#[tokio::test]
async fn bulk_delete_reloads_once_and_clears_selection() {
    let fake = FakeClinic::with_rows(patients(5));
    let controller = controller(&fake);
    controller.load().await;
    for id in ["p0", "p2", "p4"] {
        controller.toggle(&RecordId::new(id));
    }

    let state = controller.delete_selected(&accept).await.expect("delete");
    assert!(state.is_success());
    assert_eq!(
        fake.calls(),
        vec![
            "list patients".to_string(),
            "delete_many patients p0,p2,p4".to_string(),
            "list patients".to_string(),
        ]
    );
    let names: Vec<_> = controller.records().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["Patient 1", "Patient 3"]);
    assert!(controller.selected_ids().is_empty());
}

#[tokio::test]
async fn declined_delete_issues_no_call() {
    let fake = FakeClinic::with_rows(patients(2));
    let controller = controller(&fake);
    controller.load().await;
    controller.toggle(&RecordId::new("p0"));

    assert_eq!(
        controller.delete_selected(&decline).await,
        Err(GateNotice::Cancelled)
    );
    assert_eq!(
        controller
            .delete_one(&RecordId::new("p1"), &decline)
            .await,
        Err(GateNotice::Cancelled)
    );
    assert_eq!(fake.calls(), vec!["list patients".to_string()]);
    assert!(controller.is_selected(&RecordId::new("p0")));
}

#[tokio::test]
async fn failed_delete_leaves_state_untouched() {
    let fake = FakeClinic::with_rows(patients(3));
    let controller = controller(&fake);
    controller.load().await;
    controller.toggle(&RecordId::new("p1"));
    fake.fail_mutations();

    let notice = controller
        .delete_one(&RecordId::new("p1"), &accept)
        .await
        .expect_err("server error");
    assert!(matches!(
        notice,
        GateNotice::Failed {
            action: "delete",
            failure: LoadFailure::HttpStatus { status: 500, .. }
        }
    ));
    assert_eq!(controller.records().len(), 3);
    assert!(controller.is_selected(&RecordId::new("p1")));
    assert_eq!(fake.calls().iter().filter(|c| c.starts_with("list")).count(), 1);
}

#[tokio::test]
async fn create_and_update_reload_from_the_server() {
    let fake = FakeClinic::with_rows(patients(1));
    let controller = controller(&fake);
    controller.load().await;

    let new_patient = Patient {
        name: "Marta".into(),
        ..Patient::default()
    };
    let state = controller.create(&new_patient).await.expect("create");
    assert!(state.is_success());
    assert_eq!(controller.records().len(), 2);

    controller
        .update(&RecordId::new("p0"), &new_patient)
        .await
        .expect("update");
    assert_eq!(
        fake.calls(),
        vec![
            "list patients".to_string(),
            "create patients".to_string(),
            "list patients".to_string(),
            "update patients p0".to_string(),
            "list patients".to_string(),
        ]
    );
}

#[tokio::test]
async fn server_query_is_forwarded_and_refresh_clears_the_filter() {
    let fake = FakeClinic::with_rows(patients(3));
    let controller = controller(&fake);
    controller.set_server_query(Some("diabetes".into()));
    controller.load().await;
    controller.set_query("Patient 1");
    assert_eq!(controller.visible().len(), 1);

    controller.set_server_query(None);
    let state = controller.refresh().await;
    assert_eq!(state, LoadState::Settled(clinic_console::Settlement::Success));
    assert_eq!(controller.query(), "");
    assert_eq!(controller.visible().len(), 3);
    assert_eq!(
        fake.calls(),
        vec![
            "list patients q=diabetes".to_string(),
            "list patients".to_string()
        ]
    );
}
