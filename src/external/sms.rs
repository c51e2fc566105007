use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SendSmsRequest<'a> {
    to: &'a str,
    text: &'a str,
}

/// Client for the HTTP SMS gateway used to deliver one-time codes.
#[derive(Clone)]
pub struct SmsService {
    client: Client,
    config: SmsConfig,
}

impl SmsService {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_url.is_empty() && !self.config.api_key.is_empty()
    }

    pub async fn send_otp(&self, mobile: &str, code: &str) -> AppResult<()> {
        let text = format!("Your verification code: {code}");
        self.send(mobile, &text).await
    }

    pub async fn send(&self, mobile: &str, text: &str) -> AppResult<()> {
        if !self.is_configured() {
            log::info!("SMS gateway not configured, message to {mobile}: {text}");
            return Ok(());
        }

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&SendSmsRequest { to: mobile, text })
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("SMS sent to {mobile}");
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("SMS to {mobile} failed with {status}: {error_text}");
            Err(AppError::ExternalApiError(format!(
                "SMS sending failed: {error_text}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_gateway_logs_instead_of_sending() {
        let sms = SmsService::new(SmsConfig::default());
        assert!(!sms.is_configured());
        assert!(sms.send_otp("09121234567", "123456").await.is_ok());
    }
}
