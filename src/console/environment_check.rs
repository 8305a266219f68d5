use crate::models::ConsoleApp;
use crate::sender::{ResendConfig, ResendMailer, TwilioConfig, TwilioWhatsapp};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

const REQUIRED_VARS: [&str; 3] = ["RESEND_API_KEY", "TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN"];
const OPTIONAL_VARS: [&str; 3] = ["RESEND_FROM_EMAIL", "RESEND_FROM_NAME", "TWILIO_WHATSAPP_FROM"];

impl ConsoleApp {
    pub async fn environment_check(&self) -> Result<()> {
        println!("\n🔍 Provider Environment Check");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        for name in REQUIRED_VARS {
            match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => println!("  ✅ {} is set", name),
                _ => println!("  ❌ {} is missing", name),
            }
        }

        for name in OPTIONAL_VARS {
            match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => println!("  ✅ {} = {}", name, value),
                _ => println!("  ▫️ {} not set, using default", name),
            }
        }

        println!("\n📧 Resend:");
        match ResendConfig::from_env() {
            Ok(config) => {
                let mailer = ResendMailer::new(config);
                match mailer.test_connection().await {
                    Ok(()) => println!("  ✅ API reachable"),
                    Err(e) => println!("  ⚠️ API check failed: {}", e),
                }
            }
            Err(e) => println!("  ❌ Not configured: {}", e),
        }

        println!("\n📱 Twilio:");
        match TwilioConfig::from_env() {
            Ok(config) => {
                let whatsapp = TwilioWhatsapp::new(config);
                match whatsapp.test_connection().await {
                    Ok(()) => println!("  ✅ API reachable"),
                    Err(e) => println!("  ⚠️ API check failed: {}", e),
                }
            }
            Err(e) => println!("  ❌ Not configured: {}", e),
        }

        Ok(())
    }
}
