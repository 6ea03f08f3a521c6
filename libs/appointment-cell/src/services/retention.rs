// libs/appointment-cell/src/services/retention.rs
use std::sync::Arc;

use chrono::{Duration, SecondsFormat};
use reqwest::Method;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::Clock;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

#[derive(Debug, Deserialize)]
struct StatusRow {
    id: Uuid,
    status: AppointmentStatus,
}

/// Hard-deletes terminal appointments past their retention window. Live rows
/// are never deleted here; a batch containing one is rejected whole so a
/// mistyped id list cannot silently eat a booked exam.
pub struct RetentionManager {
    supabase: Arc<SupabaseClient>,
}

impl RetentionManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Read-only dry run of an age-based purge.
    pub async fn preview(
        &self,
        status: AppointmentStatus,
        older_than_days: i64,
        clock: &dyn Clock,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        require_terminal(status)?;
        let cutoff = clock.now_utc() - Duration::days(older_than_days);

        let path = format!(
            "/rest/v1/appointments?status=eq.{}&created_at=lte.{}&order=created_at.asc",
            status,
            cutoff.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows)
    }

    /// Age-based purge. Returns how many rows were deleted.
    pub async fn purge_by_age(
        &self,
        status: AppointmentStatus,
        older_than_days: i64,
        clock: &dyn Clock,
    ) -> Result<usize, AppointmentError> {
        require_terminal(status)?;
        let cutoff = clock.now_utc() - Duration::days(older_than_days);

        let path = format!(
            "/rest/v1/appointments?status=eq.{}&created_at=lte.{}",
            status,
            cutoff.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        let deleted: Vec<StatusRow> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        info!(
            "Retention purge removed {} {} appointments older than {} days",
            deleted.len(),
            status,
            older_than_days,
        );
        Ok(deleted.len())
    }

    /// Explicit-batch purge. Every id must name a terminal appointment or the
    /// whole batch is refused.
    pub async fn purge_by_ids(&self, ids: &[Uuid]) -> Result<usize, AppointmentError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let id_list = unique
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let path = format!(
            "/rest/v1/appointments?id=in.({})&select=id,status",
            id_list
        );
        let rows: Vec<StatusRow> = self.supabase.request(Method::GET, &path, None).await?;

        if rows.len() != unique.len() {
            return Err(AppointmentError::NotFound(
                "one or more ids do not exist".to_string(),
            ));
        }
        if let Some(live) = rows.iter().find(|r| !r.status.is_terminal()) {
            warn!(
                "Purge batch refused: appointment {} is still {}",
                live.id, live.status
            );
            return Err(AppointmentError::InvalidTransition {
                from: live.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        // The delete re-states eligibility so a row revived between the check
        // and this call survives the purge.
        let path = format!(
            "/rest/v1/appointments?id=in.({})&status=in.(completed,cancelled,no_show)",
            id_list
        );
        let deleted: Vec<StatusRow> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        info!("Retention purge removed {} appointments by id", deleted.len());
        Ok(deleted.len())
    }
}

fn require_terminal(status: AppointmentStatus) -> Result<(), AppointmentError> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(AppointmentError::Validation(format!(
            "retention only applies to terminal statuses, got {}",
            status
        )))
    }
}
