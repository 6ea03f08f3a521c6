// libs/admission-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::session::SessionService;

pub fn auth_routes(config: Arc<AppConfig>) -> Router {
    let service = Arc::new(SessionService::new(&config));

    let logout_route = Router::new()
        .route("/logout", post(handlers::logout))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/login", post(handlers::login))
        .merge(logout_route)
        .with_state(service)
}
