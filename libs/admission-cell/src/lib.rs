pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::auth_routes;
pub use services::rate_limit::{rate_limit_middleware, RateLimiter};
pub use services::session::{session_guard, SessionService};
