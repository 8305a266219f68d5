// src/sender/resend.rs
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use super::{MessageSender, OutboundMessage, ProviderReceipt};
use crate::models::Channel;

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
    pub base_url: String,
}

impl ResendConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ResendConfig {
            api_key: std::env::var("RESEND_API_KEY")
                .map_err(|_| "RESEND_API_KEY environment variable required")?,
            from_email: std::env::var("RESEND_FROM_EMAIL")
                .unwrap_or_else(|_| "hola@geobooker.com.mx".to_string()),
            from_name: std::env::var("RESEND_FROM_NAME")
                .unwrap_or_else(|_| "Geobooker".to_string()),
            base_url: "https://api.resend.com".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

pub struct ResendMailer {
    pub config: ResendConfig,
    client: Client,
}

impl ResendMailer {
    pub fn new(config: ResendConfig) -> Self {
        let client = Client::new();
        debug!("Created ResendMailer for sender: {}", config.from_email);
        Self { config, client }
    }

    pub async fn test_connection(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/domains", self.config.base_url);

        debug!("Testing Resend connection: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        if response.status().is_success() {
            info!("✅ Resend connection test successful");
            Ok(())
        } else {
            let error_text = response.text().await?;
            error!("❌ Resend connection test failed: {}", error_text);
            Err(format!("Resend connection failed: {}", error_text).into())
        }
    }
}

#[async_trait::async_trait]
impl MessageSender for ResendMailer {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(
        &self,
        message: &OutboundMessage,
    ) -> Result<ProviderReceipt, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}/emails", self.config.base_url);

        debug!("Preparing email for {}: {}", message.to, message.subject);

        let payload = json!({
            "from": format!("{} <{}>", self.config.from_name, self.config.from_email),
            "to": [message.to],
            "subject": message.subject,
            "html": message.body,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        debug!("Resend response status: {}", response.status());

        if response.status().is_success() {
            let parsed: ResendResponse = response.json().await?;
            debug!("Resend accepted message: {}", parsed.id);
            Ok(ProviderReceipt { id: parsed.id })
        } else {
            let error_text = response.text().await?;
            error!("Resend API error: {}", error_text);
            Err(format!("Resend error: {}", error_text).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_requires_api_key_and_defaults_the_rest() {
        let _env = crate::sender::ENV_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("RESEND_API_KEY");
        std::env::remove_var("RESEND_FROM_EMAIL");
        std::env::remove_var("RESEND_FROM_NAME");

        let err = ResendConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("RESEND_API_KEY"));

        std::env::set_var("RESEND_API_KEY", "re_test_key");
        let config = ResendConfig::from_env().unwrap();
        assert_eq!(config.api_key, "re_test_key");
        assert_eq!(config.from_email, "hola@geobooker.com.mx");
        assert_eq!(config.from_name, "Geobooker");
        assert_eq!(config.base_url, "https://api.resend.com");

        std::env::remove_var("RESEND_API_KEY");
    }
}
