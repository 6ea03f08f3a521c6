// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;

/// State machine of an appointment. There is no `pending`: a booking that
/// survives the occupancy check is `confirmed` from its first write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Whether this status holds the binding key against other bookings.
    pub fn is_occupying(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
                | AppointmentStatus::Completed
        )
    }

    /// Live statuses still move through the automatic lifecycle.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Confirmed | AppointmentStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub center_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub reason: String,
    pub client_notes: Option<String>,
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub is_second_chance: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub center_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub client_notes: Option<String>,
    /// Overrides the 40-minute default when the center runs longer exams.
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub is_second_chance: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentSearchQuery {
    pub status: Option<AppointmentStatus>,
    pub center_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Retention requests come in two shapes: an explicit id batch, or a
/// status + age policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CleanupRequest {
    ByIds { ids: Vec<Uuid> },
    ByAge {
        status: AppointmentStatus,
        older_than_days: i64,
    },
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no slot exists for the requested center, date and time")]
    SlotNotFound,

    #[error("the requested slot is disabled")]
    SlotDisabled,

    #[error("the requested slot is already booked")]
    SlotAlreadyBooked,

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("appointment not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<SupabaseError> for AppointmentError {
    fn from(e: SupabaseError) -> Self {
        match e {
            // 409 from the partial unique index on occupied binding keys.
            SupabaseError::Conflict(_) => AppointmentError::SlotAlreadyBooked,
            SupabaseError::NotFound(msg) => AppointmentError::NotFound(msg),
            other => AppointmentError::Storage(other.to_string()),
        }
    }
}
