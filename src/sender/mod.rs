// src/sender/mod.rs
use async_trait::async_trait;

use crate::models::Channel;

pub mod resend;
pub mod twilio;

pub use resend::{ResendConfig, ResendMailer};
pub use twilio::{TwilioConfig, TwilioWhatsapp};

// Message ready to hand to a provider. `subject` is empty for
// channels that have no subject line.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

// Provider identifier for a delivered message, kept for the
// dispatch_history row.
#[derive(Debug, Clone)]
pub struct ProviderReceipt {
    pub id: String,
}

// One provider client, bound to a single channel. The dispatcher only
// talks to this trait so tests can swap in a scripted sender.
#[async_trait]
pub trait MessageSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(
        &self,
        message: &OutboundMessage,
    ) -> Result<ProviderReceipt, Box<dyn std::error::Error + Send + Sync>>;
}

// Builds the provider client for a channel from environment
// credentials. Fails when a required credential is absent.
pub fn build_sender(
    channel: Channel,
) -> Result<Box<dyn MessageSender>, Box<dyn std::error::Error + Send + Sync>> {
    match channel {
        Channel::Email => {
            let config = ResendConfig::from_env()?;
            Ok(Box::new(ResendMailer::new(config)))
        }
        Channel::Whatsapp => {
            let config = TwilioConfig::from_env()?;
            Ok(Box::new(TwilioWhatsapp::new(config)))
        }
    }
}

// Env vars are process-wide. Tests that set or remove provider
// credentials serialize on this lock.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
