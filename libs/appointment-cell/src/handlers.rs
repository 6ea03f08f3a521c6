// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::clock::SystemClock;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, BookAppointmentRequest, CleanupRequest,
    UpdateStatusRequest,
};
use crate::services::booking::BookingService;
use crate::services::cancellation::CancellationCoordinator;
use crate::services::lifecycle::LifecycleEngine;
use crate::services::retention::RetentionManager;

fn map_appointment_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::Validation(msg) => AppError::ValidationError(msg),
        AppointmentError::SlotNotFound => {
            AppError::NotFound("No slot exists at the requested time".to_string())
        }
        AppointmentError::SlotDisabled => {
            AppError::Conflict("The requested slot is disabled".to_string())
        }
        AppointmentError::SlotAlreadyBooked => {
            AppError::Conflict("The requested slot is already booked".to_string())
        }
        AppointmentError::InvalidTransition { from, to } => AppError::Conflict(format!(
            "Cannot move an appointment from {} to {}",
            from, to
        )),
        AppointmentError::NotFound(msg) => AppError::NotFound(msg),
        AppointmentError::Storage(msg) => AppError::Database(msg),
    }
}

/// Public booking endpoint.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = BookingService::new(&state);

    let appointment = service
        .create(request, &SystemClock, state.booking_timezone)
        .await
        .map_err(map_appointment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let coordinator = CancellationCoordinator::new(&state);

    let appointment = coordinator
        .update_status(appointment_id, request.status, request.admin_notes)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);

    let appointments = service.search(&query).await.map_err(map_appointment_error)?;

    let total = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "total": total
    })))
}

/// Hard delete of a single appointment, refused while it is live.
#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let manager = RetentionManager::new(&state);

    let deleted = manager
        .purge_by_ids(&[appointment_id])
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "deleted": deleted
    })))
}

#[axum::debug_handler]
pub async fn cleanup_preview(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<Value>, AppError> {
    let manager = RetentionManager::new(&state);

    match request {
        CleanupRequest::ByAge {
            status,
            older_than_days,
        } => {
            let rows = manager
                .preview(status, older_than_days, &SystemClock)
                .await
                .map_err(map_appointment_error)?;

            let total = rows.len();
            Ok(Json(json!({
                "appointments": rows,
                "total": total
            })))
        }
        CleanupRequest::ByIds { .. } => Err(AppError::BadRequest(
            "Preview takes a status and an age, not an id list".to_string(),
        )),
    }
}

#[axum::debug_handler]
pub async fn cleanup(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<Value>, AppError> {
    let manager = RetentionManager::new(&state);

    let deleted = match request {
        CleanupRequest::ByIds { ids } => manager
            .purge_by_ids(&ids)
            .await
            .map_err(map_appointment_error)?,
        CleanupRequest::ByAge {
            status,
            older_than_days,
        } => manager
            .purge_by_age(status, older_than_days, &SystemClock)
            .await
            .map_err(map_appointment_error)?,
    };

    Ok(Json(json!({
        "success": true,
        "deleted": deleted
    })))
}

/// Cron entry point. Guarded by the shared internal token rather than an
/// admin session, so the scheduler needs no login flow.
#[axum::debug_handler]
pub async fn lifecycle_sweep(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = headers
        .get("x-internal-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if state.cron_secret.is_empty() || token != state.cron_secret {
        return Err(AppError::Auth("Invalid internal token".to_string()));
    }

    let engine = LifecycleEngine::new(&state);
    let report = engine
        .sweep(&SystemClock)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
