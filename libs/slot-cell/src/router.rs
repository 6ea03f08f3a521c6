// libs/slot-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn slot_routes(state: Arc<AppConfig>) -> Router {
    // Catalog management is admin-only; the availability query is the public
    // read path for the booking form.
    let admin_routes = Router::new()
        .route("/", post(handlers::create_slots))
        .route("/{slot_id}/enabled", patch(handlers::set_slot_enabled))
        .route("/{slot_id}", delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::get_available_slots))
        .merge(admin_routes)
        .with_state(state)
}
