// libs/slot-cell/src/services/availability.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{AvailabilityQuery, Slot, SlotError};
use crate::services::occupancy::OccupancyView;

/// Public availability: a slot is free iff it is enabled and
/// no occupying appointment holds its binding key. Derived on every query,
/// never cached in a flag.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    occupancy: OccupancyView,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::with_client(supabase)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        let occupancy = OccupancyView::new(Arc::clone(&supabase));
        Self { supabase, occupancy }
    }

    pub async fn available_slots(&self, query: AvailabilityQuery) -> Result<Vec<Slot>, SlotError> {
        if query.start > query.end {
            return Err(SlotError::Validation("start must not be after end".to_string()));
        }

        let path = format!(
            "/rest/v1/slots?center_id=eq.{}&date=gte.{}&date=lte.{}&enabled=eq.true&order=date.asc,start_time.asc",
            query.center_id, query.start, query.end,
        );
        let slots: Vec<Slot> = self.supabase.request(Method::GET, &path, None).await?;

        let occupied = self
            .occupancy
            .occupied_keys(query.center_id, query.start, query.end)
            .await?;

        let free: Vec<Slot> = slots
            .into_iter()
            .filter(|slot| !occupied.contains(&(slot.date, slot.start_time)))
            .collect();

        debug!(
            "{} free slots for center {} between {} and {}",
            free.len(),
            query.center_id,
            query.start,
            query.end
        );
        Ok(free)
    }
}
