//! Controller, editor and board driven through `HttpApi` against a mock server.

use std::sync::Arc;
use std::time::Duration;

use clinic_console::{
    ApiTimeouts, CollectionController, ConsoleConfig, EditorMode, HttpApi, KindProfile,
    LoadFailure, RecordEditor, TreatmentBoard,
};
use clinic_models::{Medicine, Patient, RecordId, ResourceKind};
use httpmock::MockServer;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;

fn http_api(server: &MockServer) -> Arc<HttpApi> {
    let base = Url::parse(&server.base_url()).expect("mock URL");
    let config = ConsoleConfig::new(base);
    config.validate().expect("valid config");
    Arc::new(HttpApi::new(config.base_url, ApiTimeouts::default(), "it-run").expect("client"))
}

#[tokio::test]
async fn kind_envelope_is_normalised_over_http() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/medicines");
        then.status(200).json_body(json!({
            "medicines": [
                {"id": "m1", "name": "Ibuprofen", "quantity": 200},
                {"id": "m2", "name": "Amoxicillin", "quantity": null}
            ]
        }));
    });

    let controller = CollectionController::<Medicine, _>::new(
        http_api(&server),
        KindProfile::list_view(ResourceKind::Medicines),
    );
    assert!(controller.load().await.is_success());
    controller.set_query("200");
    let visible: Vec<_> = controller.visible().into_iter().map(|m| m.name).collect();
    assert_eq!(visible, ["Ibuprofen"]);
}

#[tokio::test]
async fn server_errors_surface_as_http_status_failures() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/patients");
        then.status(500).json_body(json!({
            "status": 500,
            "error": "Internal Server Error",
            "message": "database unavailable"
        }));
    });

    let controller = CollectionController::<Patient, _>::new(
        http_api(&server),
        KindProfile::list_view(ResourceKind::Patients),
    );
    let state = controller.load().await;
    match state.failure() {
        Some(LoadFailure::HttpStatus {
            status, message, ..
        }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected state: {other:?}"),
    }
}

#[tokio::test]
async fn single_delete_hits_record_path_then_reloads() {
    let server = MockServer::start_async().await;
    let list = server.mock(|when, then| {
        when.method(GET).path("/api/patients");
        then.status(200).json_body(json!([{"id": "p1", "name": "Ana"}]));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/api/patients/p1");
        then.status(200);
    });

    let controller = CollectionController::<Patient, _>::new(
        http_api(&server),
        KindProfile::list_view(ResourceKind::Patients),
    );
    controller.load().await;
    controller
        .delete_one(&RecordId::new("p1"), &|_: &str| true)
        .await
        .expect("delete");
    delete.assert();
    list.assert_hits(2);
}

#[tokio::test]
async fn editor_round_trips_through_http() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/patients/p1");
        then.status(200)
            .json_body(json!({"id": "p1", "name": "Ana", "age": 28, "medicalHistory": "Asthma"}));
    });
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/patients/p1")
            .json_body(json!({"id": "p1", "name": "Ana", "age": 29, "medicalHistory": "Asthma"}));
        then.status(200)
            .json_body(json!({"id": "p1", "name": "Ana", "age": 29, "medicalHistory": "Asthma"}));
    });

    let mut editor = RecordEditor::<Patient, _>::new(
        http_api(&server),
        KindProfile::list_view(ResourceKind::Patients),
        EditorMode::Edit(RecordId::new("p1")),
    );
    assert!(editor.load().await.is_success());
    editor.draft_mut().age = Some(29);
    let saved = editor.save().await.expect("save");
    put.assert();
    assert_eq!(saved.age, Some(29));
}

#[tokio::test]
async fn board_survives_a_failing_lookup_list() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/treatments");
        then.status(200).json_body(json!([
            {"id": "t1", "patientId": "p1", "staffId": "s1", "medicineId": "m1", "description": "Checkup"}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/patients");
        then.status(200).json_body(json!([{"id": "p1", "name": "Ana"}]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/staff");
        then.status(503);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/medicines");
        then.status(200).json_body(json!({"items": [{"id": "m1", "name": "Ibuprofen"}]}));
    });

    let mut board = TreatmentBoard::new(
        http_api(&server),
        Duration::from_secs(12),
        Duration::from_secs(5),
    );
    assert!(board.load().await.is_success());
    let rows = board.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].patient, "Ana");
    assert_eq!(rows[0].staff, "s1");
    assert_eq!(rows[0].medicine, "Ibuprofen");
}
