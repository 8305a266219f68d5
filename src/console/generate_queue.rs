use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::models::{Channel, ConsoleApp, Tier};
use crate::queue::generate_queue;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl ConsoleApp {
    pub async fn generate_queue_interactive(&self, channel: Channel) -> Result<()> {
        println!("\n📬 Queue Generation ({})", channel);
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let limit: i64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Maximum contacts to queue")
            .default(self.config.queue.default_limit)
            .interact_text()?;

        let tier_options = vec![
            "🌐 All tiers".to_string(),
            "⭐ AAA only".to_string(),
            "✨ AA only".to_string(),
            "🔹 A only".to_string(),
            "▫️ B only".to_string(),
        ];

        let tier_selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Filter by tier")
            .default(0)
            .items(&tier_options)
            .interact()?;

        let tier = if tier_selection == 0 {
            None
        } else {
            Some(Tier::ALL[tier_selection - 1])
        };

        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Queue up to {} contacts for {}?", limit, channel))
            .default(true)
            .interact()?
        {
            println!("❌ Generation cancelled");
            return Ok(());
        }

        let summary =
            generate_queue(&self.db_pool, channel, limit, tier, &self.config.queue).await?;

        println!("\n✅ {} contact(s) queued for {}", summary.contacts_added, channel);
        for tier in Tier::ALL {
            if let Some(count) = summary.tier_distribution.get(tier.as_str()) {
                println!("  • {}: {}", tier, count);
            }
        }

        Ok(())
    }
}
