pub mod models;
pub mod services;

pub use models::{BookingNotice, NotificationError};
pub use services::mailer::{HttpMailer, NotificationGateway};
