// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Booking is the only public write in the system; everything else on the
    // appointment surface requires an admin session.
    let admin_routes = Router::new()
        .route("/", get(handlers::search_appointments))
        .route(
            "/{appointment_id}/status",
            put(handlers::update_appointment_status),
        )
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route("/cleanup/preview", post(handlers::cleanup_preview))
        .route("/cleanup", post(handlers::cleanup))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", post(handlers::book_appointment))
        .merge(admin_routes)
        .with_state(state)
}

/// Routes for the scheduler, guarded by the shared internal token instead of
/// an admin session.
pub fn internal_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/lifecycle/sweep", post(handlers::lifecycle_sweep))
        .with_state(state)
}
