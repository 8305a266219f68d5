// src/sender/twilio.rs
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{MessageSender, OutboundMessage, ProviderReceipt};
use crate::models::Channel;

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub base_url: String,
}

impl TwilioConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(TwilioConfig {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID")
                .map_err(|_| "TWILIO_ACCOUNT_SID environment variable required")?,
            auth_token: std::env::var("TWILIO_AUTH_TOKEN")
                .map_err(|_| "TWILIO_AUTH_TOKEN environment variable required")?,
            from_number: std::env::var("TWILIO_WHATSAPP_FROM")
                .unwrap_or_else(|_| "+14155238886".to_string()),
            base_url: "https://api.twilio.com".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwilioResponse {
    sid: String,
}

pub struct TwilioWhatsapp {
    pub config: TwilioConfig,
    client: Client,
}

// Twilio expects the whatsapp: prefix on both numbers and rejects
// separators inside the number itself. Stored values may carry spaces,
// dashes or parentheses.
fn whatsapp_number(value: &str) -> String {
    let trimmed = value.trim();
    let bare = trimmed.strip_prefix("whatsapp:").unwrap_or(trimmed);
    let normalized: String = bare
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    format!("whatsapp:{}", normalized)
}

impl TwilioWhatsapp {
    pub fn new(config: TwilioConfig) -> Self {
        let client = Client::new();
        debug!("Created TwilioWhatsapp for account: {}", config.account_sid);
        Self { config, client }
    }

    pub async fn test_connection(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}.json",
            self.config.base_url, self.config.account_sid
        );

        debug!("Testing Twilio connection: {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;

        if response.status().is_success() {
            info!("✅ Twilio connection test successful");
            Ok(())
        } else {
            let error_text = response.text().await?;
            error!("❌ Twilio connection test failed: {}", error_text);
            Err(format!("Twilio connection failed: {}", error_text).into())
        }
    }
}

#[async_trait::async_trait]
impl MessageSender for TwilioWhatsapp {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn send(
        &self,
        message: &OutboundMessage,
    ) -> Result<ProviderReceipt, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        );

        let from = whatsapp_number(&self.config.from_number);
        let to = whatsapp_number(&message.to);

        debug!("Preparing WhatsApp message for {}", to);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("From", from.as_str()),
                ("To", to.as_str()),
                ("Body", message.body.as_str()),
            ])
            .send()
            .await?;

        debug!("Twilio response status: {}", response.status());

        if response.status().is_success() {
            let parsed: TwilioResponse = response.json().await?;
            debug!("Twilio accepted message: {}", parsed.sid);
            Ok(ProviderReceipt { id: parsed.sid })
        } else {
            let error_text = response.text().await?;
            error!("Twilio API error: {}", error_text);
            Err(format!("Twilio error: {}", error_text).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_prefix_is_added_once() {
        assert_eq!(whatsapp_number("+5215512345678"), "whatsapp:+5215512345678");
        assert_eq!(
            whatsapp_number("whatsapp:+5215512345678"),
            "whatsapp:+5215512345678"
        );
        assert_eq!(whatsapp_number("  +521551 "), "whatsapp:+521551");
    }

    #[test]
    fn stored_separators_are_stripped_before_sending() {
        assert_eq!(
            whatsapp_number("+52 55 1234-5678"),
            "whatsapp:+525512345678"
        );
        assert_eq!(whatsapp_number("(55) 1234 5678"), "whatsapp:5512345678");
        assert_eq!(
            whatsapp_number("whatsapp:+52 55 1234 5678"),
            "whatsapp:+525512345678"
        );
    }

    #[test]
    fn from_env_requires_both_credentials() {
        let _env = crate::sender::ENV_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("TWILIO_ACCOUNT_SID");
        std::env::remove_var("TWILIO_AUTH_TOKEN");
        std::env::remove_var("TWILIO_WHATSAPP_FROM");

        let err = TwilioConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("TWILIO_ACCOUNT_SID"));

        std::env::set_var("TWILIO_ACCOUNT_SID", "ACxxxx");
        let err = TwilioConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("TWILIO_AUTH_TOKEN"));

        std::env::set_var("TWILIO_AUTH_TOKEN", "secret");
        let config = TwilioConfig::from_env().unwrap();
        assert_eq!(config.from_number, "+14155238886");

        std::env::remove_var("TWILIO_ACCOUNT_SID");
        std::env::remove_var("TWILIO_AUTH_TOKEN");
    }
}
