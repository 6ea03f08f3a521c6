// libs/appointment-cell/src/services/cancellation.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use notification_cell::{HttpMailer, NotificationGateway};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use slot_cell::services::occupancy::OccupancyView;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::booking::notice_for;

/// Manual status transitions: cancellation, restore, and the admin-side
/// terminal moves. Cancelling releases the binding key (the cancelled row no
/// longer holds its binding key) and never touches the slot's `enabled` flag;
/// availability reappears because it is derived, not stored.
pub struct CancellationCoordinator {
    supabase: Arc<SupabaseClient>,
    occupancy: OccupancyView,
    mailer: Arc<dyn NotificationGateway>,
}

impl CancellationCoordinator {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            occupancy: OccupancyView::new(Arc::clone(&supabase)),
            mailer: Arc::new(HttpMailer::new(config)),
            supabase,
        }
    }

    /// Dispatch a manual transition. Cancel and restore carry extra rules;
    /// the remaining legal moves are plain status writes.
    pub async fn update_status(
        &self,
        id: Uuid,
        target: AppointmentStatus,
        admin_notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_by_id(id).await?;

        match (current.status, target) {
            (from, to) if from == to => Ok(current),
            (from, AppointmentStatus::Cancelled) if from.is_live() => {
                self.cancel(current, admin_notes).await
            }
            (AppointmentStatus::Cancelled, AppointmentStatus::Confirmed) => {
                self.restore(current, admin_notes).await
            }
            (from, AppointmentStatus::NoShow) if from.is_live() => {
                self.write_status(id, AppointmentStatus::NoShow, admin_notes)
                    .await
            }
            (from, AppointmentStatus::Completed) if from.is_live() => {
                self.write_status(id, AppointmentStatus::Completed, admin_notes)
                    .await
            }
            (from, to) => Err(AppointmentError::InvalidTransition { from, to }),
        }
    }

    /// Cancel a live appointment. The reason lands in `admin_notes`; the
    /// client is told by email, best-effort.
    async fn cancel(
        &self,
        appointment: Appointment,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let reason_text = reason.unwrap_or_else(|| "cancelled by the center".to_string());
        let notes = append_note(appointment.admin_notes.as_deref(), &reason_text);

        let updated = self
            .write_status(appointment.id, AppointmentStatus::Cancelled, Some(notes))
            .await?;

        info!("Appointment {} cancelled: {}", updated.id, reason_text);

        let notice = notice_for(&updated);
        if let Err(e) = self.mailer.booking_cancelled(&notice, &reason_text).await {
            warn!(
                "Cancellation mail for appointment {} failed: {}",
                updated.id, e
            );
        }

        Ok(updated)
    }

    /// Bring a cancelled appointment back to `confirmed`, provided its
    /// binding key was not claimed in the meantime. The partial unique index
    /// backstops the remaining race: a concurrent claim turns the PATCH into
    /// a 409, surfaced as `SlotAlreadyBooked`.
    async fn restore(
        &self,
        appointment: Appointment,
        admin_notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let occupied = self
            .occupancy
            .is_occupied(
                appointment.center_id,
                appointment.date,
                appointment.time,
                Some(appointment.id),
            )
            .await?;
        if occupied {
            return Err(AppointmentError::SlotAlreadyBooked);
        }

        let updated = self
            .write_status(appointment.id, AppointmentStatus::Confirmed, admin_notes)
            .await?;
        info!("Appointment {} restored to confirmed", updated.id);
        Ok(updated)
    }

    async fn write_status(
        &self,
        id: Uuid,
        target: AppointmentStatus,
        admin_notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let mut body = json!({
            "status": target,
            "updated_at": Utc::now().to_rfc3339(),
        });
        if let Some(notes) = admin_notes {
            body["admin_notes"] = Value::String(notes);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))
    }
}

fn append_note(existing: Option<&str>, addition: &str) -> String {
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{}\n{}", notes, addition),
        _ => addition.to_string(),
    }
}
