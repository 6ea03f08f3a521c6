// libs/notification-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of an appointment the mailer needs. Callers build this so the
/// notification cell stays independent of the appointment model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingNotice {
    pub appointment_id: Uuid,
    pub center_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("mailer is not configured")]
    NotConfigured,

    #[error("mail API rejected the message ({status})")]
    Api { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
