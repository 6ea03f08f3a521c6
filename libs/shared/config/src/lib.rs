use std::env;

use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub session_jwt_secret: String,
    pub cron_secret: String,
    pub redis_url: Option<String>,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub admin_alert_email: String,
    pub booking_timezone: Tz,
    pub public_rate_limit: u32,
    pub public_rate_window_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            session_jwt_secret: env::var("SESSION_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SESSION_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            cron_secret: env::var("CRON_SECRET")
                .unwrap_or_else(|_| {
                    warn!("CRON_SECRET not set, sweep endpoint will reject all calls");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok(),
            mail_api_url: env::var("MAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("MAIL_API_URL not set, notifications will fail (non-fatal)");
                    String::new()
                }),
            mail_api_key: env::var("MAIL_API_KEY").unwrap_or_default(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@example.test".to_string()),
            admin_alert_email: env::var("ADMIN_ALERT_EMAIL").unwrap_or_default(),
            booking_timezone: env::var("BOOKING_TIMEZONE")
                .ok()
                .and_then(|raw| {
                    raw.parse::<Tz>()
                        .map_err(|_| warn!("BOOKING_TIMEZONE {:?} is not a valid IANA name", raw))
                        .ok()
                })
                .unwrap_or(chrono_tz::Europe::Paris),
            public_rate_limit: env::var("PUBLIC_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            public_rate_window_secs: env::var("PUBLIC_RATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.session_jwt_secret.is_empty()
    }
}
