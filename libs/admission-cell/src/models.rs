// libs/admission-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_seconds: i64,
}

/// Row shape of the admin_users table. Password hashes are argon2 strings;
/// hashing itself is a direct library call, not something this cell designs.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session store unavailable: {0}")]
    SessionStore(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("token error: {0}")]
    Token(String),
}
