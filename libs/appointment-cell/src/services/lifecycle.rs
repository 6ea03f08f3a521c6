// libs/appointment-cell/src/services/lifecycle.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::clock::{civil_to_utc, Clock};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use slot_cell::services::occupancy::LIVE_STATUSES;

/// Default exam length in minutes, stored on each row so individual
/// appointments can deviate.
pub const DEFAULT_DURATION_MINUTES: i32 = 40;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub to_in_progress: usize,
    pub to_completed: usize,
}

/// Automatic status transitions driven purely by the wall clock. The status
/// of a live appointment is a function of (its civil start, its duration,
/// now); sweeping twice with the same `now` writes nothing the second time.
pub struct LifecycleEngine {
    supabase: Arc<SupabaseClient>,
    tz: Tz,
}

impl LifecycleEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            tz: config.booking_timezone,
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, tz: Tz) -> Self {
        Self { supabase, tz }
    }

    /// Where a live appointment belongs at `now`. Pure; terminal statuses are
    /// never fed into this.
    pub fn status_at(
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: i32,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> AppointmentStatus {
        let Some(start) = civil_to_utc(date, time, tz) else {
            // Unresolvable civil time; leave the row alone.
            return AppointmentStatus::Confirmed;
        };
        let end = start + Duration::minutes(duration_minutes as i64);

        if now < start {
            AppointmentStatus::Confirmed
        } else if now <= end {
            AppointmentStatus::InProgress
        } else {
            AppointmentStatus::Completed
        }
    }

    /// Walk every live appointment up to today and batch the rows whose
    /// computed status differs from the stored one. Cancelled and no_show are
    /// excluded by the status filter and never resurrected.
    pub async fn sweep(&self, clock: &dyn Clock) -> Result<SweepReport, AppointmentError> {
        let now = clock.now_utc();
        let today = clock.today(self.tz);

        let path = format!(
            "/rest/v1/appointments?status=in.({})&date=lte.{}&order=date.asc,time.asc",
            LIVE_STATUSES, today,
        );
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;

        let mut report = SweepReport {
            examined: rows.len(),
            ..Default::default()
        };

        let mut batches: HashMap<AppointmentStatus, Vec<Uuid>> = HashMap::new();
        for row in &rows {
            let target = Self::status_at(row.date, row.time, row.duration_minutes, self.tz, now);
            if target != row.status {
                batches.entry(target).or_default().push(row.id);
            }
        }

        for (target, ids) in batches {
            match target {
                AppointmentStatus::InProgress => report.to_in_progress += ids.len(),
                AppointmentStatus::Completed => report.to_completed += ids.len(),
                _ => {}
            }
            self.apply_batch(target, &ids, now).await?;
        }

        info!(
            "Lifecycle sweep: {} examined, {} -> in_progress, {} -> completed",
            report.examined, report.to_in_progress, report.to_completed,
        );
        Ok(report)
    }

    async fn apply_batch(
        &self,
        target: AppointmentStatus,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        let id_list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/appointments?id=in.({})", id_list);

        debug!("Transitioning {} appointments to {}", ids.len(), target);

        let _updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({
                    "status": target,
                    "updated_at": now.to_rfc3339(),
                })),
                Some(SupabaseClient::prefer_representation()),
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn paris() -> Tz {
        chrono_tz::Europe::Paris
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        // 2025-01-10 is CET, UTC+1: 09:00 local is 08:00 UTC.
        Utc.with_ymd_and_hms(2025, 1, 10, h, m, 0).unwrap()
    }

    fn slot() -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn confirmed_before_start() {
        let (date, time) = slot();
        let status = LifecycleEngine::status_at(date, time, 40, paris(), at(7, 59));
        assert_eq!(status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn in_progress_ten_minutes_in() {
        let (date, time) = slot();
        // 09:10 local.
        let status = LifecycleEngine::status_at(date, time, 40, paris(), at(8, 10));
        assert_eq!(status, AppointmentStatus::InProgress);
    }

    #[test]
    fn completed_after_end() {
        let (date, time) = slot();
        // 09:45 local, five minutes past a 40-minute slot.
        let status = LifecycleEngine::status_at(date, time, 40, paris(), at(8, 45));
        assert_eq!(status, AppointmentStatus::Completed);
    }

    #[test]
    fn boundary_instants_are_inclusive() {
        let (date, time) = slot();
        assert_eq!(
            LifecycleEngine::status_at(date, time, 40, paris(), at(8, 0)),
            AppointmentStatus::InProgress,
        );
        assert_eq!(
            LifecycleEngine::status_at(date, time, 40, paris(), at(8, 40)),
            AppointmentStatus::InProgress,
        );
    }

    #[test]
    fn batches_group_by_target_status() {
        let (date, time) = slot();
        let now = at(8, 10);

        let mut batches: HashMap<AppointmentStatus, Vec<u32>> = HashMap::new();
        for (id, minutes_ago) in [(1u32, 100), (2, 90), (3, 5)] {
            let start = time - chrono::Duration::minutes(minutes_ago);
            let target = LifecycleEngine::status_at(date, start, 40, paris(), now);
            batches.entry(target).or_default().push(id);
        }

        assert_eq!(batches[&AppointmentStatus::Completed], vec![1, 2]);
        assert_eq!(batches[&AppointmentStatus::InProgress], vec![3]);
    }

    #[test]
    fn status_at_is_idempotent_for_a_fixed_instant() {
        let (date, time) = slot();
        let now = at(8, 10);
        let first = LifecycleEngine::status_at(date, time, 40, paris(), now);
        let second = LifecycleEngine::status_at(date, time, 40, paris(), now);
        assert_eq!(first, second);
    }
}
