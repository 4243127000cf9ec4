// src/notifier.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::NotifyError;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Best-effort operator channel. Must be callable from several chain tasks at once.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API `sendMessage`
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_api_base(TELEGRAM_API, token, chat_id)
    }

    pub fn with_api_base(
        api_base: &str,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let payload = json!({ "chat_id": self.chat_id, "text": text });

        // the URL embeds the bot token, keep it out of error strings
        let resp = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body: TelegramResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::Api(format!("HTTP {}: {}", status, e.without_url())))?;

        if !body.ok {
            return Err(NotifyError::Api(
                body.description.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        debug!("📨 Telegram message delivered to chat {}", self.chat_id);
        Ok(())
    }
}
