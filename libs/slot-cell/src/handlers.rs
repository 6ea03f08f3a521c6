// libs/slot-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{AvailabilityQuery, CreateSlotsRequest, SetEnabledRequest, SlotError};
use crate::services::availability::AvailabilityService;
use crate::services::catalog::SlotCatalogService;

fn map_slot_error(err: SlotError) -> AppError {
    match err {
        SlotError::NotFound => AppError::NotFound("Slot not found".to_string()),
        SlotError::SlotOccupied => {
            AppError::Conflict("Slot is bound to a live appointment".to_string())
        }
        SlotError::Validation(msg) => AppError::BadRequest(msg),
        SlotError::Storage(msg) => AppError::Database(msg),
    }
}

/// Public availability query: enabled slots minus occupied binding keys.
#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let slots = service
        .available_slots(query)
        .await
        .map_err(map_slot_error)?;

    let total = slots.len();
    Ok(Json(json!({
        "slots": slots,
        "total": total
    })))
}

#[axum::debug_handler]
pub async fn create_slots(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SlotCatalogService::new(&state);

    let slots = service.create_slots(request).await.map_err(map_slot_error)?;

    let total = slots.len();
    Ok(Json(json!({
        "success": true,
        "slots": slots,
        "total": total
    })))
}

#[axum::debug_handler]
pub async fn set_slot_enabled(
    State(state): State<Arc<AppConfig>>,
    Path(slot_id): Path<Uuid>,
    Json(request): Json<SetEnabledRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SlotCatalogService::new(&state);

    let slot = service
        .set_enabled(slot_id, request.enabled)
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<AppConfig>>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SlotCatalogService::new(&state);

    service.delete_slot(slot_id).await.map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted"
    })))
}
