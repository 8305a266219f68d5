use chrono::Utc;
use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::database::set_daily_limit;
use crate::models::{Channel, ConsoleApp};
use crate::quota::QuotaTracker;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl ConsoleApp {
    pub async fn set_daily_limit_interactive(&self) -> Result<()> {
        println!("\n⚙️  Channel Daily Limit");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let channels = vec![Channel::Email, Channel::Whatsapp];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Channel")
            .items(&channels)
            .interact()?;
        let channel = channels[selection];

        let current = QuotaTracker::new(self.db_pool.clone())
            .status(channel, Utc::now())
            .await?;

        let limit: i64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("New daily limit")
            .default(current.daily_limit)
            .interact_text()?;

        if limit < 0 {
            println!("❌ Limit must be zero or positive");
            return Ok(());
        }

        set_daily_limit(&self.db_pool, channel, limit).await?;
        println!("✅ {} daily limit set to {}", channel, limit);

        Ok(())
    }
}
