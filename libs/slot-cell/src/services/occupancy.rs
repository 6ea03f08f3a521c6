// libs/slot-cell/src/services/occupancy.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_database::{SupabaseClient, SupabaseError};

/// Statuses that hold a binding key against other bookings. `cancelled` and
/// `no_show` never occupy a slot.
pub const OCCUPYING_STATUSES: &str = "confirmed,in_progress,completed";

/// Statuses from which automatic transitions are still possible. Slots bound
/// to one of these cannot be deleted.
pub const LIVE_STATUSES: &str = "confirmed,in_progress";

#[derive(Debug, Deserialize)]
struct BindingKeyRow {
    date: NaiveDate,
    time: NaiveTime,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: Uuid,
}

/// Read-only view over the appointments table answering "who holds which
/// binding key". This is the single definition of occupancy; both the public
/// availability query and the booking/restore pre-checks go through it.
pub struct OccupancyView {
    supabase: Arc<SupabaseClient>,
}

impl OccupancyView {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Occupied binding keys for a center over a date window.
    pub async fn occupied_keys(
        &self,
        center_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<(NaiveDate, NaiveTime)>, SupabaseError> {
        let path = format!(
            "/rest/v1/appointments?center_id=eq.{}&date=gte.{}&date=lte.{}&status=in.({})&select=date,time",
            center_id, start, end, OCCUPYING_STATUSES,
        );

        let rows: Vec<BindingKeyRow> = self.supabase.request(Method::GET, &path, None).await?;
        debug!("{} occupied binding keys for center {}", rows.len(), center_id);

        Ok(rows.into_iter().map(|r| (r.date, r.time)).collect())
    }

    /// Whether a single binding key is occupied, optionally excluding
    /// one appointment id (used by restore, which must not see itself).
    pub async fn is_occupied(
        &self,
        center_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, SupabaseError> {
        let mut path = format!(
            "/rest/v1/appointments?center_id=eq.{}&date=eq.{}&time=eq.{}&status=in.({})&select=id&limit=1",
            center_id, date, time, OCCUPYING_STATUSES,
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<IdRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    /// Whether a non-terminal appointment is bound to the key. Guards slot
    /// deletion.
    pub async fn has_live_appointment(
        &self,
        center_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, SupabaseError> {
        let path = format!(
            "/rest/v1/appointments?center_id=eq.{}&date=eq.{}&time=eq.{}&status=in.({})&select=id&limit=1",
            center_id, date, time, LIVE_STATUSES,
        );

        let rows: Vec<IdRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }
}
