// libs/notification-cell/src/services/mailer.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{BookingNotice, NotificationError};

/// Email dispatch seam. All call sites are best-effort: a failed send is
/// logged by the caller and never rolls back the booking or cancellation.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn booking_confirmed(&self, notice: &BookingNotice) -> Result<(), NotificationError>;
    async fn booking_cancelled(
        &self,
        notice: &BookingNotice,
        reason: &str,
    ) -> Result<(), NotificationError>;
    async fn admin_new_booking(&self, notice: &BookingNotice) -> Result<(), NotificationError>;
}

/// Sends through a transactional-mail HTTP API.
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
    admin_email: String,
}

impl HttpMailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
            admin_email: config.admin_alert_email.clone(),
        }
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), NotificationError> {
        if self.api_url.is_empty() {
            return Err(NotificationError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}/send", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Api { status: status.as_u16() });
        }

        debug!("Mail accepted for {} ({})", to, subject);
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for HttpMailer {
    async fn booking_confirmed(&self, notice: &BookingNotice) -> Result<(), NotificationError> {
        let subject = "Votre rendez-vous est confirmé";
        let text = format!(
            "Bonjour {} {},\n\nVotre test psychotechnique est confirmé le {} à {}.\n\nRéférence : {}",
            notice.first_name, notice.last_name, notice.date, notice.time, notice.appointment_id,
        );
        self.send(&notice.email, subject, &text).await?;
        info!("Confirmation sent for appointment {}", notice.appointment_id);
        Ok(())
    }

    async fn booking_cancelled(
        &self,
        notice: &BookingNotice,
        reason: &str,
    ) -> Result<(), NotificationError> {
        let subject = "Votre rendez-vous a été annulé";
        let text = format!(
            "Bonjour {} {},\n\nVotre rendez-vous du {} à {} a été annulé.\nMotif : {}",
            notice.first_name, notice.last_name, notice.date, notice.time, reason,
        );
        self.send(&notice.email, subject, &text).await?;
        info!("Cancellation notice sent for appointment {}", notice.appointment_id);
        Ok(())
    }

    async fn admin_new_booking(&self, notice: &BookingNotice) -> Result<(), NotificationError> {
        if self.admin_email.is_empty() {
            return Err(NotificationError::NotConfigured);
        }
        let subject = format!("Nouvelle réservation le {} à {}", notice.date, notice.time);
        let text = format!(
            "{} {} ({}) - {} - rendez-vous {}",
            notice.first_name, notice.last_name, notice.email, notice.reason, notice.appointment_id,
        );
        self.send(&self.admin_email, &subject, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notice() -> BookingNotice {
        BookingNotice {
            appointment_id: Uuid::new_v4(),
            center_id: Uuid::new_v4(),
            first_name: "Jean".to_string(),
            last_name: "Dupont".to_string(),
            email: "jean@example.test".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            reason: "permis".to_string(),
        }
    }

    fn mailer(api_url: &str) -> HttpMailer {
        HttpMailer {
            client: Client::new(),
            api_url: api_url.to_string(),
            api_key: "key".to_string(),
            from: "no-reply@center.test".to_string(),
            admin_email: "ops@center.test".to_string(),
        }
    }

    #[tokio::test]
    async fn confirmed_mail_posts_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        mailer(&server.uri()).booking_confirmed(&notice()).await.unwrap();
    }

    #[tokio::test]
    async fn api_failure_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = mailer(&server.uri()).booking_confirmed(&notice()).await.unwrap_err();
        assert!(matches!(err, NotificationError::Api { status: 500 }));
    }

    #[tokio::test]
    async fn unconfigured_mailer_reports_not_configured() {
        let err = mailer("").booking_confirmed(&notice()).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotConfigured));
    }
}
