// libs/slot-cell/src/services/catalog.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CreateSlotsRequest, Slot, SlotError};
use crate::services::occupancy::OccupancyView;

pub struct SlotCatalogService {
    supabase: Arc<SupabaseClient>,
    occupancy: OccupancyView,
}

impl SlotCatalogService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::with_client(supabase)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        let occupancy = OccupancyView::new(Arc::clone(&supabase));
        Self { supabase, occupancy }
    }

    pub fn occupancy(&self) -> &OccupancyView {
        &self.occupancy
    }

    /// Bulk-create slots for one date. Duplicated windows in the same request
    /// are rejected before any insert.
    pub async fn create_slots(&self, request: CreateSlotsRequest) -> Result<Vec<Slot>, SlotError> {
        if request.windows.is_empty() {
            return Err(SlotError::Validation("at least one window is required".to_string()));
        }

        let capacity = request.capacity.unwrap_or(1);
        if capacity < 1 {
            return Err(SlotError::Validation("capacity must be at least 1".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for window in &request.windows {
            if window.start_time >= window.end_time {
                return Err(SlotError::Validation(format!(
                    "window {} - {} is empty or inverted",
                    window.start_time, window.end_time
                )));
            }
            if !seen.insert(window.start_time) {
                return Err(SlotError::Validation(format!(
                    "duplicate window starting at {}",
                    window.start_time
                )));
            }
        }

        let now = Utc::now();
        let rows: Vec<Value> = request
            .windows
            .iter()
            .map(|window| {
                json!({
                    "center_id": request.center_id,
                    "date": request.date,
                    "start_time": window.start_time,
                    "end_time": window.end_time,
                    "enabled": true,
                    "capacity": capacity,
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                })
            })
            .collect();

        let created: Vec<Slot> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/slots",
                Some(Value::Array(rows)),
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        info!(
            "Created {} slots for center {} on {}",
            created.len(),
            request.center_id,
            request.date
        );
        Ok(created)
    }

    /// Admin blackout toggle. This is the only writer of `enabled`; booking
    /// and cancellation never touch it.
    pub async fn set_enabled(&self, slot_id: Uuid, enabled: bool) -> Result<Slot, SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let body = json!({
            "enabled": enabled,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Slot> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        let slot = updated.into_iter().next().ok_or(SlotError::NotFound)?;
        info!("Slot {} enabled={}", slot_id, enabled);
        Ok(slot)
    }

    /// Delete a slot unless a non-terminal appointment is bound to it.
    pub async fn delete_slot(&self, slot_id: Uuid) -> Result<(), SlotError> {
        let slot = self
            .get_slot_by_id(slot_id)
            .await?
            .ok_or(SlotError::NotFound)?;

        let live = self
            .occupancy
            .has_live_appointment(slot.center_id, slot.date, slot.start_time)
            .await?;
        if live {
            return Err(SlotError::SlotOccupied);
        }

        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        info!("Slot {} deleted", slot_id);
        Ok(())
    }

    pub async fn get_slot_by_id(&self, slot_id: Uuid) -> Result<Option<Slot>, SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);
        let rows: Vec<Slot> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    /// Look up a slot by binding key. BookingService resolves the requested
    /// window through this.
    pub async fn get_slot(
        &self,
        center_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Slot>, SlotError> {
        let path = format!(
            "/rest/v1/slots?center_id=eq.{}&date=eq.{}&start_time=eq.{}",
            center_id, date, time,
        );
        debug!("Slot lookup {}", path);
        let rows: Vec<Slot> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }
}
