use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Fire-and-forget outbound notification port. Callers never block a
/// settlement path on this; the event worker is the only driver.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn notify(&self, user_id: Uuid, subject: &str, body: &str) -> Result<(), ServiceError>;
}

pub struct HttpNotificationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotificationClient {
    pub fn new(base_url: String) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!(
                    "failed to build notification http client: {}",
                    e
                ))
            })?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl NotificationClient for HttpNotificationClient {
    async fn notify(&self, user_id: Uuid, subject: &str, body: &str) -> Result<(), ServiceError> {
        #[derive(Serialize)]
        struct NotifyBody<'a> {
            user_id: Uuid,
            subject: &'a str,
            body: &'a str,
        }

        let url = format!("{}/notifications", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&NotifyBody {
                user_id,
                subject,
                body,
            })
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("notification send failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "notification service returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Logs instead of delivering. Default when no service URL is configured.
#[derive(Default)]
pub struct LoggingNotificationClient;

#[async_trait]
impl NotificationClient for LoggingNotificationClient {
    async fn notify(&self, user_id: Uuid, subject: &str, body: &str) -> Result<(), ServiceError> {
        info!(%user_id, subject, body, "notification (log only)");
        Ok(())
    }
}
