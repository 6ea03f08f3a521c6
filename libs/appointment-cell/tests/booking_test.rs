// libs/appointment-cell/tests/booking_test.rs
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentError, AppointmentStatus, BookAppointmentRequest};
use appointment_cell::services::booking::BookingService;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const CENTER: &str = "5f6d9c4e-1b2a-4c3d-8e7f-0a1b2c3d4e5f";

fn paris() -> chrono_tz::Tz {
    chrono_tz::Europe::Paris
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
}

fn request() -> BookAppointmentRequest {
    BookAppointmentRequest {
        center_id: Uuid::parse_str(CENTER).unwrap(),
        first_name: "Jean".to_string(),
        last_name: "Dupont".to_string(),
        email: "jean.dupont@example.test".to_string(),
        phone: "+33612345678".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
        time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        reason: "permis B".to_string(),
        client_notes: None,
        duration_minutes: None,
        is_second_chance: false,
    }
}

fn service_for(mock: &MockServer) -> BookingService {
    let config = TestConfig::default()
        .with_supabase_url(&mock.uri())
        .to_app_config();
    BookingService::new(&config)
}

async fn mount_slot(mock: &MockServer, enabled: bool) {
    let row = MockSupabaseResponses::slot_row(
        Uuid::new_v4(),
        Uuid::parse_str(CENTER).unwrap(),
        "2025-06-10",
        "09:00:00",
        enabled,
    );
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(mock)
        .await;
}

#[tokio::test]
async fn booking_creates_a_confirmed_appointment() {
    let mock_server = MockServer::start().await;
    mount_slot(&mock_server, true).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let created = MockSupabaseResponses::appointment_row(
        Uuid::new_v4(),
        Uuid::parse_str(CENTER).unwrap(),
        "2025-06-10",
        "09:00:00",
        "confirmed",
    );
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let appointment = service_for(&mock_server)
        .create(request(), &clock(), paris())
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.duration_minutes, 40);
}

#[tokio::test]
async fn booking_refuses_an_occupied_binding_key() {
    let mock_server = MockServer::start().await;
    mount_slot(&mock_server, true).await;

    // The pre-check sees an occupying row; the insert must never fire.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": Uuid::new_v4()}])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = service_for(&mock_server)
        .create(request(), &clock(), paris())
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::SlotAlreadyBooked);
}

#[tokio::test]
async fn index_conflict_resolves_the_booking_race() {
    let mock_server = MockServer::start().await;
    mount_slot(&mock_server, true).await;

    // Pre-check passes, but a concurrent booking wins the insert: the
    // partial unique index answers 409.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&mock_server)
        .await;

    let err = service_for(&mock_server)
        .create(request(), &clock(), paris())
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::SlotAlreadyBooked);
}

#[tokio::test]
async fn booking_refuses_a_disabled_slot() {
    let mock_server = MockServer::start().await;
    mount_slot(&mock_server, false).await;

    let err = service_for(&mock_server)
        .create(request(), &clock(), paris())
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::SlotDisabled);
}

#[tokio::test]
async fn booking_refuses_an_unknown_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let err = service_for(&mock_server)
        .create(request(), &clock(), paris())
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::SlotNotFound);
}

#[tokio::test]
async fn validation_rejects_bad_input_before_any_storage_access() {
    let mock_server = MockServer::start().await;
    let service = service_for(&mock_server);

    let mut past = request();
    past.date = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    assert_matches!(
        service.create(past, &clock(), paris()).await.unwrap_err(),
        AppointmentError::Validation(_)
    );

    let mut bad_email = request();
    bad_email.email = "not-an-address".to_string();
    assert_matches!(
        service
            .create(bad_email, &clock(), paris())
            .await
            .unwrap_err(),
        AppointmentError::Validation(_)
    );

    let mut bad_phone = request();
    bad_phone.phone = "abc".to_string();
    assert_matches!(
        service
            .create(bad_phone, &clock(), paris())
            .await
            .unwrap_err(),
        AppointmentError::Validation(_)
    );

    let mut too_long = request();
    too_long.duration_minutes = Some(300);
    assert_matches!(
        service
            .create(too_long, &clock(), paris())
            .await
            .unwrap_err(),
        AppointmentError::Validation(_)
    );

    let mut no_name = request();
    no_name.first_name = "  ".to_string();
    assert_matches!(
        service.create(no_name, &clock(), paris()).await.unwrap_err(),
        AppointmentError::Validation(_)
    );

    // No mock was mounted; reaching storage would have failed loudly.
}

#[tokio::test]
async fn transient_insert_failure_is_retried_once() {
    let mock_server = MockServer::start().await;
    mount_slot(&mock_server, true).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let created = MockSupabaseResponses::appointment_row(
        Uuid::new_v4(),
        Uuid::parse_str(CENTER).unwrap(),
        "2025-06-10",
        "09:00:00",
        "confirmed",
    );
    // First insert attempt fails with a 503, the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .mount(&mock_server)
        .await;

    let appointment = service_for(&mock_server)
        .create(request(), &clock(), paris())
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
}
