use std::time::Duration;

use super::{ChatId, DeliveryError, Notifier};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Sends plain-text messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: String, token: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), DeliveryError> {
        let payload = json!({
            "chat_id": recipient.0,
            "text": text,
        });

        // The Bot API reports failures in the body with a 4xx status, so decode either way.
        // The URL embeds the bot token and is stripped from errors.
        let response = async {
            self.client
                .post(self.send_message_url())
                .json(&payload)
                .send()
                .await?
                .json::<BotResponse>()
                .await
        };
        let response = response.await.map_err(reqwest::Error::without_url)?;

        if !response.ok {
            return Err(DeliveryError::Rejected(
                response
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url_strips_trailing_slash() {
        let notifier = TelegramNotifier::new(
            "http://127.0.0.1:9000/".into(),
            "123:abc".into(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(
            notifier.send_message_url(),
            "http://127.0.0.1:9000/bot123:abc/sendMessage"
        );
    }
}
