use chrono::Utc;
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::dispatcher::Dispatcher;
use crate::models::{Channel, ConsoleApp};
use crate::quota::QuotaTracker;
use crate::sender::build_sender;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl ConsoleApp {
    pub async fn run_dispatch_interactive(&self, channel: Channel) -> Result<()> {
        println!("\n📤 Dispatch Run ({})", channel);
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let quota = QuotaTracker::new(self.db_pool.clone())
            .status(channel, Utc::now())
            .await?;

        let conn = self.db_pool.get().await?;
        let pending: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dispatch_queue WHERE channel = ?1 AND status = 'pending'",
            [channel.as_str()],
            |row| row.get(0),
        )?;
        drop(conn);

        println!("📊 Sent today: {}/{}", quota.sent_today, quota.daily_limit);
        println!("📋 Pending in queue: {}", pending);

        if quota.is_exhausted() {
            println!("🛑 Daily limit already reached, try again tomorrow");
            return Ok(());
        }

        if pending == 0 {
            println!("📭 Queue is empty, generate it first");
            return Ok(());
        }

        let batch = pending.min(quota.batch_capacity());
        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Send up to {} message(s) via {} now?", batch, channel))
            .default(false)
            .interact()?
        {
            println!("❌ Dispatch cancelled");
            return Ok(());
        }

        let sender = build_sender(channel)?;
        let dispatcher =
            Dispatcher::new(self.db_pool.clone(), sender, self.config.dispatch.clone());
        let report = dispatcher.run().await?;

        println!("\n🏁 Run {} finished", report.run_id);
        println!("  ✅ Sent: {}", report.sent);
        println!("  ❌ Failed: {}", report.failed);
        println!("  📉 Remaining today: {}", report.remaining);

        if !report.errors.is_empty() {
            println!("\n⚠️  Failures:");
            for failure in report.errors.iter().take(10) {
                println!(
                    "  • {} (queue item {}): {}",
                    failure.contact, failure.queue_id, failure.error
                );
            }
            if report.errors.len() > 10 {
                println!("  ... and {} more", report.errors.len() - 10);
            }
        }

        Ok(())
    }
}
