// libs/appointment-cell/tests/retention_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use appointment_cell::services::retention::RetentionManager;
use shared_database::SupabaseClient;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn manager_for(mock: &MockServer) -> RetentionManager {
    let config = TestConfig::default()
        .with_supabase_url(&mock.uri())
        .to_app_config();
    RetentionManager::with_client(Arc::new(SupabaseClient::new(&config)))
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn preview_queries_with_the_computed_cutoff() {
    let mock_server = MockServer::start().await;

    let old = MockSupabaseResponses::appointment_row(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "2025-01-10",
        "09:00:00",
        "completed",
    );

    // 90 days before 2025-06-01T12:00:00Z.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.completed"))
        .and(query_param("created_at", "lte.2025-03-03T12:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([old])))
        .mount(&mock_server)
        .await;

    let rows = manager_for(&mock_server)
        .preview(AppointmentStatus::Completed, 90, &clock())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn purge_by_age_reports_the_deleted_count() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": Uuid::new_v4(), "status": "cancelled"},
            {"id": Uuid::new_v4(), "status": "cancelled"},
        ])))
        .mount(&mock_server)
        .await;

    let deleted = manager_for(&mock_server)
        .purge_by_age(AppointmentStatus::Cancelled, 30, &clock())
        .await
        .unwrap();
    assert_eq!(deleted, 2);
}

#[tokio::test]
async fn purge_refuses_non_terminal_statuses_outright() {
    let mock_server = MockServer::start().await;
    let manager = manager_for(&mock_server);

    assert_matches!(
        manager
            .purge_by_age(AppointmentStatus::Confirmed, 30, &clock())
            .await
            .unwrap_err(),
        AppointmentError::Validation(_)
    );
    assert_matches!(
        manager
            .preview(AppointmentStatus::InProgress, 30, &clock())
            .await
            .unwrap_err(),
        AppointmentError::Validation(_)
    );
}

#[tokio::test]
async fn purge_by_ids_rejects_a_batch_containing_a_live_row() {
    let mock_server = MockServer::start().await;
    let terminal = Uuid::new_v4();
    let live = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": terminal, "status": "completed"},
            {"id": live, "status": "confirmed"},
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = manager_for(&mock_server)
        .purge_by_ids(&[terminal, live])
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::InvalidTransition { .. });
}

#[tokio::test]
async fn purge_by_ids_deletes_a_fully_terminal_batch() {
    let mock_server = MockServer::start().await;
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": first, "status": "completed"},
            {"id": second, "status": "no_show"},
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "in.(completed,cancelled,no_show)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": first, "status": "completed"},
            {"id": second, "status": "no_show"},
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let deleted = manager_for(&mock_server)
        .purge_by_ids(&[first, second])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
}

// A row restored between the eligibility check and the delete must survive:
// the delete carries its own terminal-status filter, so the storage layer
// skips the revived row and the count reflects what was actually removed.
#[tokio::test]
async fn purge_by_ids_spares_a_row_revived_after_the_check() {
    let mock_server = MockServer::start().await;
    let stays_cancelled = Uuid::new_v4();
    let revived = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": stays_cancelled, "status": "cancelled"},
            {"id": revived, "status": "cancelled"},
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "in.(completed,cancelled,no_show)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": stays_cancelled, "status": "cancelled"},
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let deleted = manager_for(&mock_server)
        .purge_by_ids(&[stays_cancelled, revived])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn purge_by_ids_tolerates_duplicate_ids_in_the_batch() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("in.({})", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": id, "status": "cancelled"},
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": id, "status": "cancelled"},
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let deleted = manager_for(&mock_server)
        .purge_by_ids(&[id, id])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn empty_id_batch_is_a_no_op() {
    let mock_server = MockServer::start().await;
    let deleted = manager_for(&mock_server).purge_by_ids(&[]).await.unwrap();
    assert_eq!(deleted, 0);
}
