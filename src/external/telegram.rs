use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API client. Without a bot token every send is skipped.
#[derive(Clone)]
pub struct TelegramService {
    client: Client,
    bot_token: Option<String>,
}

impl TelegramService {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some()
    }

    /// Returns `Ok(false)` when the bot is not configured.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> AppResult<bool> {
        let Some(token) = &self.bot_token else {
            return Ok(false);
        };

        let url = format!("{API_BASE}/bot{token}/sendMessage");
        let response: TelegramResponse = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await?
            .json()
            .await?;

        if response.ok {
            Ok(true)
        } else {
            Err(AppError::ExternalApiError(format!(
                "Telegram sendMessage failed: {}",
                response.description.unwrap_or_default()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_bot_skips_send() {
        let telegram = TelegramService::new(TelegramConfig {
            bot_token: Some(String::new()),
        });
        assert!(!telegram.is_configured());
        assert!(!telegram.send_message("1", "hi").await.unwrap());
    }
}
