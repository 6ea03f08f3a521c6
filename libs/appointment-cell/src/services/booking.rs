// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use regex::Regex;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use notification_cell::{BookingNotice, HttpMailer, NotificationGateway};
use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};
use shared_utils::clock::Clock;
use slot_cell::services::catalog::SlotCatalogService;

use crate::models::{Appointment, AppointmentError, BookAppointmentRequest};
use crate::services::lifecycle::DEFAULT_DURATION_MINUTES;

/// Creates appointments against the slot catalog, keeping each binding key
/// single-occupant:
/// validate, resolve the slot, pre-check occupancy, insert `confirmed`. The
/// database's partial unique index resolves the remaining race window; its
/// 409 reaches the caller as `SlotAlreadyBooked` like any other full slot.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    catalog: SlotCatalogService,
    mailer: Arc<dyn NotificationGateway>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            catalog: SlotCatalogService::with_client(Arc::clone(&supabase)),
            mailer: Arc::new(HttpMailer::new(config)),
            supabase,
        }
    }

    pub async fn create(
        &self,
        request: BookAppointmentRequest,
        clock: &dyn Clock,
        tz: chrono_tz::Tz,
    ) -> Result<Appointment, AppointmentError> {
        self.validate(&request, clock, tz)?;

        let slot = self
            .catalog
            .get_slot(request.center_id, request.date, request.time)
            .await
            .map_err(|e| AppointmentError::Storage(e.to_string()))?
            .ok_or(AppointmentError::SlotNotFound)?;

        if !slot.enabled {
            return Err(AppointmentError::SlotDisabled);
        }

        // Occupancy pre-check. The index catches what slips between this read
        // and the insert.
        let occupied = self
            .catalog
            .occupancy()
            .is_occupied(request.center_id, request.date, request.time, None)
            .await
            .map_err(AppointmentError::from)?;
        if occupied {
            return Err(AppointmentError::SlotAlreadyBooked);
        }

        let appointment = self.insert(&request).await?;
        info!(
            "Appointment {} booked: center {} on {} at {}",
            appointment.id, appointment.center_id, appointment.date, appointment.time,
        );

        self.notify_booked(&appointment).await;
        Ok(appointment)
    }

    async fn insert(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let body = json!({
            "center_id": request.center_id,
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "email": request.email.trim(),
            "phone": request.phone.trim(),
            "date": request.date,
            "time": request.time,
            "duration_minutes": request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            "status": "confirmed",
            "reason": request.reason.trim(),
            "client_notes": request.client_notes,
            "is_second_chance": request.is_second_chance,
        });

        let mut attempt = 0;
        loop {
            let result: Result<Vec<Appointment>, SupabaseError> = self
                .supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/appointments",
                    Some(body.clone()),
                    Some(SupabaseClient::prefer_representation()),
                )
                .await;

            match result {
                Ok(rows) => {
                    return rows.into_iter().next().ok_or_else(|| {
                        AppointmentError::Storage("insert returned no row".to_string())
                    });
                }
                Err(e) if e.is_transient() && attempt == 0 => {
                    attempt += 1;
                    debug!("Transient insert failure, retrying once: {}", e);
                }
                Err(e) => return Err(AppointmentError::from(e)),
            }
        }
    }

    /// Client confirmation plus admin alert. Failures are logged and
    /// swallowed; the booking already stands.
    async fn notify_booked(&self, appointment: &Appointment) {
        let notice = notice_for(appointment);

        if let Err(e) = self.mailer.booking_confirmed(&notice).await {
            warn!(
                "Confirmation mail for appointment {} failed: {}",
                appointment.id, e
            );
        }
        if let Err(e) = self.mailer.admin_new_booking(&notice).await {
            warn!(
                "Admin alert for appointment {} failed: {}",
                appointment.id, e
            );
        }
    }

    fn validate(
        &self,
        request: &BookAppointmentRequest,
        clock: &dyn Clock,
        tz: chrono_tz::Tz,
    ) -> Result<(), AppointmentError> {
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "First and last name are required".to_string(),
            ));
        }
        if request.reason.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "A reason for the exam is required".to_string(),
            ));
        }

        let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
        if !email_regex.is_match(request.email.trim()) || request.email.len() > 254 {
            return Err(AppointmentError::Validation(
                "Email address is not valid".to_string(),
            ));
        }

        let phone_regex = Regex::new(r"^\+?[0-9][0-9\s\-\.]{7,17}$").unwrap();
        if !phone_regex.is_match(request.phone.trim()) {
            return Err(AppointmentError::Validation(
                "Phone number is not valid".to_string(),
            ));
        }

        if let Some(duration) = request.duration_minutes {
            if !(15..=180).contains(&duration) {
                return Err(AppointmentError::Validation(
                    "Duration must be between 15 and 180 minutes".to_string(),
                ));
            }
        }

        if request.date < clock.today(tz) {
            return Err(AppointmentError::Validation(
                "Cannot book an appointment in the past".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn search(
        &self,
        query: &crate::models::AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = String::from("/rest/v1/appointments?order=date.desc,time.desc");

        if let Some(status) = &query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        if let Some(center_id) = query.center_id {
            path.push_str(&format!("&center_id=eq.{}", center_id));
        }
        if let Some(start) = query.start {
            path.push_str(&format!("&date=gte.{}", start));
        }
        if let Some(end) = query.end {
            path.push_str(&format!("&date=lte.{}", end));
        }
        path.push_str(&format!("&limit={}", query.limit.unwrap_or(50).min(200)));
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows)
    }
}

pub(crate) fn notice_for(appointment: &Appointment) -> BookingNotice {
    BookingNotice {
        appointment_id: appointment.id,
        center_id: appointment.center_id,
        first_name: appointment.first_name.clone(),
        last_name: appointment.last_name.clone(),
        email: appointment.email.clone(),
        date: appointment.date,
        time: appointment.time,
        reason: appointment.reason.clone(),
    }
}
