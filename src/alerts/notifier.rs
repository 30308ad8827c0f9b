//! Notification handlers for public-repository alerts

use std::time::Duration;

use async_trait::async_trait;

use super::record::NotifyTarget;

/// Delivers a one-time alert for an entity confirmed newly public
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, entity: &str) -> Result<(), NotifierError>;
}

/// Notifier for sending alert notifications
pub struct Notifier {
    client: reqwest::Client,
    target: NotifyTarget,
    web_base: String,
}

impl Notifier {
    /// Create a notifier whose webhook calls are bounded by `timeout`
    pub fn new(
        target: NotifyTarget,
        web_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Client(e.to_string()))?;

        Ok(Self {
            client,
            target,
            web_base: web_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Human-readable alert text
    pub fn message(&self, entity: &str) -> String {
        format!(
            ":rotating_light: {} is PUBLIC.\n{}/{}",
            entity, self.web_base, entity
        )
    }

    /// Send webhook notification
    async fn send_webhook(&self, url: &str, entity: &str, message: &str) -> Result<(), NotifierError> {
        let payload = serde_json::json!({ "text": message });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Status(response.status().as_u16()));
        }

        tracing::debug!(entity = %entity, "Webhook notification sent");

        Ok(())
    }
}

#[async_trait]
impl Notify for Notifier {
    async fn notify(&self, entity: &str) -> Result<(), NotifierError> {
        let message = self.message(entity);

        match &self.target {
            NotifyTarget::Log => {
                tracing::warn!(entity = %entity, "Repository alert: {}", message);
                Ok(())
            }
            NotifyTarget::Webhook { url } => self.send_webhook(url, entity, &message).await,
        }
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Webhook returned status {0}")]
    Status(u16),
}
