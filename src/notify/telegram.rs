// src/notify/telegram.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use super::{DeliveryError, NotificationSink};
use crate::config::NotificationCredentials;

/// Longest slice of an error body kept for logs and the response.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Sends messages through the Telegram Bot API `sendMessage` method.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: Url,
}

impl TelegramSink {
    /// Builds a sink whose every request is bounded by `timeout`.
    pub fn new(api_base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_base })
    }

    /// `{base}/bot{token}/sendMessage`, keeping any path prefix on `base`.
    pub fn endpoint(&self, bot_token: &str) -> Result<Url, DeliveryError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| DeliveryError::InvalidEndpoint(self.api_base.to_string()))?
            .pop_if_empty()
            .push(&format!("bot{}", bot_token))
            .push("sendMessage");
        Ok(url)
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(
        &self,
        credentials: &NotificationCredentials,
        text: &str,
    ) -> Result<(), DeliveryError> {
        let url = self.endpoint(&credentials.bot_token)?;
        let payload = SendMessage {
            chat_id: &credentials.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

// reqwest errors carry the request URL, which embeds the bot token.
fn classify(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(err.without_url().to_string())
    }
}
