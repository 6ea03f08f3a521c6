// libs/admission-cell/src/services/rate_limit.rs
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::AdmissionError;

/// Fixed-window per-key admission counter backed by redis, so the limit holds
/// across all service instances rather than per-process memory.
pub struct RateLimiter {
    pool: Option<Pool>,
    limit: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub async fn new(config: &AppConfig) -> Self {
        let pool = match &config.redis_url {
            Some(url) => match Config::from_url(url.clone()).create_pool(Some(Runtime::Tokio1)) {
                Ok(pool) => {
                    info!("Rate limiter connected to shared redis store");
                    Some(pool)
                }
                Err(e) => {
                    warn!("Failed to create redis pool, rate limiting disabled: {}", e);
                    None
                }
            },
            None => {
                warn!("REDIS_URL not set, rate limiting disabled");
                None
            }
        };

        Self {
            pool,
            limit: config.public_rate_limit,
            window_secs: config.public_rate_window_secs,
        }
    }

    #[cfg(test)]
    pub fn disabled(limit: u32, window_secs: u64) -> Self {
        Self { pool: None, limit, window_secs }
    }

    /// True when the caller is under the window limit. Fails open when redis is
    /// unreachable: the booking invariant never depends on the limiter.
    pub async fn check(&self, scope: &str, client_key: &str) -> bool {
        match self.try_check(scope, client_key).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!("Rate limit check failed, admitting request: {}", e);
                true
            }
        }
    }

    async fn try_check(&self, scope: &str, client_key: &str) -> Result<bool, AdmissionError> {
        let Some(pool) = &self.pool else {
            return Ok(true);
        };

        let mut conn = pool
            .get()
            .await
            .map_err(|e| AdmissionError::SessionStore(e.to_string()))?;

        let key = format!("ratelimit:{}:{}", scope, client_key);
        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(self.window_secs)
                .query_async(&mut conn)
                .await?;
        }

        debug!("Rate key {} at {}/{}", key, count, self.limit);
        Ok(count <= self.limit)
    }
}

/// Client key for admission control: first hop of X-Forwarded-For when the
/// service sits behind a proxy, else the literal peer marker.
fn client_key(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);

    if !limiter.check("public", &key).await {
        return Err(AppError::RateLimited(
            "Too many requests, retry later".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn admits_everything_without_a_store() {
        let limiter = RateLimiter::disabled(1, 60);

        for _ in 0..5 {
            assert!(limiter.check("public", "203.0.113.7").await);
        }
    }

    #[test]
    fn client_key_uses_first_forwarded_hop() {
        let mut request = Request::new(Body::empty());
        request.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        assert_eq!(client_key(&request), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_when_header_missing() {
        let request = Request::new(Body::empty());
        assert_eq!(client_key(&request), "unknown");
    }
}
