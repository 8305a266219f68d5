use crate::database::recent_history;
use crate::models::ConsoleApp;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl ConsoleApp {
    pub async fn show_recent_history(&self) -> Result<()> {
        println!("\n📜 Recent Dispatch History");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let records = recent_history(&self.db_pool, 20).await?;

        if records.is_empty() {
            println!("📭 Nothing sent yet");
            return Ok(());
        }

        for record in &records {
            println!(
                "  • [{}] {} contact {} {} ({})",
                record.sent_at.format("%Y-%m-%d %H:%M UTC"),
                record.channel,
                record.contact_id,
                record.status,
                record.message_id.as_deref().unwrap_or("-")
            );
        }

        Ok(())
    }
}
