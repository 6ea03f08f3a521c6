// libs/admission-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use tracing::info;

use shared_models::{auth::User, error::AppError};

use crate::models::{AdmissionError, LoginRequest};
use crate::services::session::SessionService;

fn map_admission_error(e: AdmissionError) -> AppError {
    match e {
        AdmissionError::InvalidCredentials => {
            AppError::Auth("Invalid email or password".to_string())
        }
        AdmissionError::Token(msg) => AppError::Internal(msg),
        AdmissionError::SessionStore(msg) => AppError::Internal(msg),
        AdmissionError::Redis(e) => AppError::Internal(e.to_string()),
        AdmissionError::Storage(msg) => AppError::Database(msg),
    }
}

pub async fn login(
    State(service): State<Arc<SessionService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email and password are required".to_string(),
        ));
    }

    let session = service
        .login(payload.email.trim(), &payload.password)
        .await
        .map_err(map_admission_error)?;

    Ok(Json(json!({
        "success": true,
        "token": session.token,
        "expires_in_seconds": session.expires_in_seconds,
    })))
}

pub async fn logout(
    State(service): State<Arc<SessionService>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    service
        .logout(&user.session_id)
        .await
        .map_err(map_admission_error)?;

    info!("Admin {} logged out", user.id);
    Ok(Json(json!({
        "success": true,
        "message": "Session closed"
    })))
}
