mod telegram;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NotificationConfig;

pub use telegram::TelegramNotifier;

/// Chat identity of an admin recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rejected by chat API: {0}")]
    Rejected(String),
}

/// Outbound text capability supplied by the chat layer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), DeliveryError>;
}

/// Fallback used when no chat transport is configured: alerts only reach the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), DeliveryError> {
        tracing::info!(%recipient, text, "Notification (no chat transport configured)");
        Ok(())
    }
}

/// Factory function to create a notifier based on config
pub fn create_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>, reqwest::Error> {
    match config.telegram_bot_token.as_deref() {
        Some(token) if !token.is_empty() => Ok(Arc::new(TelegramNotifier::new(
            config.telegram_api_base.clone(),
            token.to_string(),
            config.request_timeout(),
        )?)),
        _ => Ok(Arc::new(LogNotifier)),
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<(ChatId, DeliveryError)>,
}

/// Send `text` to every recipient. A failure is logged and recorded, and never stops the
/// remaining sends.
pub async fn broadcast(notifier: &dyn Notifier, recipients: &[ChatId], text: &str) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for &recipient in recipients {
        match notifier.notify(recipient, text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                tracing::warn!(%recipient, error = %e, "Failed to deliver notification");
                report.failed.push((recipient, e));
            }
        }
    }

    report
}
