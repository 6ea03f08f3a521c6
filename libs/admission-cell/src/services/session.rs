// libs/admission-cell/src/services/session.rs
use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use reqwest::Method;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};

use crate::models::{AdminUserRow, AdmissionError, LoginResponse};

/// Admin session lifetime. Sessions outlive a working day but not a weekend.
pub const SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;

/// Admin credential check plus session issuance and revocation. Revoked
/// session ids live in redis for the remaining token lifetime, so a stolen
/// token dies with the logout that revoked it.
pub struct SessionService {
    supabase: SupabaseClient,
    jwt_secret: String,
    redis: Option<Pool>,
}

impl SessionService {
    pub fn new(config: &AppConfig) -> Self {
        let redis = config.redis_url.as_ref().and_then(|url| {
            match Config::from_url(url.clone()).create_pool(Some(Runtime::Tokio1)) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Failed to create redis pool for sessions: {}", e);
                    None
                }
            }
        });

        Self {
            supabase: SupabaseClient::new(config),
            jwt_secret: config.session_jwt_secret.clone(),
            redis,
        }
    }

    /// Verify credentials against the admin_users table and issue a session
    /// token. Unknown email and wrong password are indistinguishable to the
    /// caller.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, AdmissionError> {
        let path = format!(
            "/rest/v1/admin_users?email=eq.{}&select=id,email,password_hash,role&limit=1",
            urlencoding::encode(email)
        );

        let rows: Vec<AdminUserRow> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AdmissionError::Storage(e.to_string()))?;

        let user = rows.into_iter().next().ok_or_else(|| {
            info!("Login rejected: unknown admin email");
            AdmissionError::InvalidCredentials
        })?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AdmissionError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                info!("Login rejected: password mismatch for {}", user.id);
                AdmissionError::InvalidCredentials
            })?;

        if user.role != "admin" {
            info!("Login rejected: non-admin role for {}", user.id);
            return Err(AdmissionError::InvalidCredentials);
        }

        let (token, _jti) = issue_token(
            &user.id.to_string(),
            &user.email,
            &user.role,
            &self.jwt_secret,
            SESSION_TTL_SECONDS,
        )
        .map_err(AdmissionError::Token)?;

        info!("Admin session opened for {}", user.id);
        Ok(LoginResponse {
            token,
            expires_in_seconds: SESSION_TTL_SECONDS,
        })
    }

    /// Put the session id on the revocation list for the full token lifetime.
    pub async fn logout(&self, session_id: &str) -> Result<(), AdmissionError> {
        let Some(pool) = &self.redis else {
            warn!("Logout without redis: token stays valid until expiry");
            return Ok(());
        };

        let mut conn = pool
            .get()
            .await
            .map_err(|e| AdmissionError::SessionStore(e.to_string()))?;

        let key = format!("revoked_session:{}", session_id);
        let _: () = redis::cmd("SETEX")
            .arg(&key)
            .arg(SESSION_TTL_SECONDS)
            .arg("1")
            .query_async(&mut conn)
            .await?;

        info!("Session {} revoked", session_id);
        Ok(())
    }

    /// Revocation check fails open: if redis is down, a logged-out token is
    /// honoured until expiry rather than locking every admin out.
    pub async fn is_revoked(&self, session_id: &str) -> bool {
        let Some(pool) = &self.redis else {
            return false;
        };

        let mut conn = match pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Revocation check unavailable: {}", e);
                return false;
            }
        };

        let key = format!("revoked_session:{}", session_id);
        match conn.exists::<_, bool>(&key).await {
            Ok(revoked) => revoked,
            Err(e) => {
                warn!("Revocation check failed: {}", e);
                false
            }
        }
    }
}

/// Reject bearer tokens whose session has been revoked. Requests without a
/// token pass through untouched, so this guard can wrap routers that mix
/// public and admin routes without caring about layer order.
pub async fn session_guard(
    State(service): State<Arc<SessionService>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Ok(user) = validate_token(token, &service.jwt_secret) {
            if service.is_revoked(&user.session_id).await {
                return Err(AppError::Auth("Session has been revoked".to_string()));
            }
        }
    }

    Ok(next.run(request).await)
}
