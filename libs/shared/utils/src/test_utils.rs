use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub cron_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            cron_secret: "test-cron-secret".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(mut self, url: &str) -> Self {
        self.supabase_url = url.to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            session_jwt_secret: self.jwt_secret.clone(),
            cron_secret: self.cron_secret.clone(),
            redis_url: None,
            mail_api_url: String::new(),
            mail_api_key: String::new(),
            mail_from: "no-reply@center.test".to_string(),
            admin_alert_email: "ops@center.test".to_string(),
            booking_timezone: chrono_tz::Europe::Paris,
            public_rate_limit: 20,
            public_rate_window_secs: 60,
        }
    }

}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn slot_row(
        id: Uuid,
        center_id: Uuid,
        date: &str,
        start_time: &str,
        enabled: bool,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "center_id": center_id,
            "date": date,
            "start_time": start_time,
            "end_time": "23:59:00",
            "enabled": enabled,
            "capacity": 1,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        id: Uuid,
        center_id: Uuid,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "center_id": center_id,
            "first_name": "Jean",
            "last_name": "Dupont",
            "email": "jean.dupont@example.test",
            "phone": "+33612345678",
            "date": date,
            "time": time,
            "duration_minutes": 40,
            "status": status,
            "reason": "permis",
            "client_notes": null,
            "admin_notes": null,
            "is_second_chance": false,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }
}
