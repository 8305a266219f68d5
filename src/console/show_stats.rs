use chrono::Utc;
use tracing::{debug, error};

use crate::database::get_database_stats;
use crate::models::{Channel, ConsoleApp};
use crate::quota::QuotaTracker;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl ConsoleApp {
    pub async fn show_database_stats(&self) -> Result<()> {
        debug!("📊 show_database_stats() - Starting...");

        println!("\n📊 Database Statistics");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let stats = match get_database_stats(&self.db_pool).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("💥 get_database_stats failed: {}", e);
                return Err(e);
            }
        };

        println!("🏢 Total contacts: {}", stats.total_contacts);
        println!("📧 With email address: {}", stats.contacts_with_email);
        println!("📱 With phone number: {}", stats.contacts_with_phone);
        println!("📜 History records: {}", stats.history_records);

        if !stats.queue.is_empty() {
            println!("\n📋 Queue by channel:");
            for channel_stats in &stats.queue {
                println!(
                    "  • {}: {} pending, {} sending, {} sent, {} failed",
                    channel_stats.channel,
                    channel_stats.pending,
                    channel_stats.sending,
                    channel_stats.sent,
                    channel_stats.failed
                );
            }
        }

        let tracker = QuotaTracker::new(self.db_pool.clone());
        let now = Utc::now();

        println!("\n📈 Daily quota:");
        for channel in Channel::ALL {
            let quota = tracker.status(channel, now).await?;
            println!(
                "  • {}: {}/{} sent today, {} remaining",
                channel, quota.sent_today, quota.daily_limit, quota.remaining
            );
        }

        Ok(())
    }
}
