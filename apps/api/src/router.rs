use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};

use admission_cell::{auth_routes, rate_limit_middleware, session_guard, RateLimiter, SessionService};
use appointment_cell::{appointment_routes, internal_routes};
use shared_config::AppConfig;
use slot_cell::slot_routes;

pub async fn create_router(state: Arc<AppConfig>) -> Router {
    let limiter = Arc::new(RateLimiter::new(&state).await);
    let sessions = Arc::new(SessionService::new(&state));

    // Everything except the cron surface goes through admission control: the
    // fixed-window limiter first, then the revocation check on any bearer
    // token the request carries.
    let api = Router::new()
        .route("/", get(|| async { "Exam booking API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/slots", slot_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .layer(middleware::from_fn_with_state(sessions, session_guard))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    // The scheduler authenticates with the shared internal token instead.
    api.nest("/internal", internal_routes(state))
}
