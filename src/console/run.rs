use dialoguer::{theme::ColorfulTheme, Select};

use crate::{
    console::console::MenuAction,
    models::{Channel, ConsoleApp, Result},
};
use tracing::error;

impl ConsoleApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🚀 Welcome to Geobooker Outreach!");
        println!("═══════════════════════════════════════");

        // Show initial stats
        self.show_database_stats().await?;

        loop {
            let actions = vec![
                MenuAction::GenerateEmailQueue,
                MenuAction::GenerateWhatsappQueue,
                MenuAction::RunEmailDispatch,
                MenuAction::RunWhatsappDispatch,
                MenuAction::ShowStats,
                MenuAction::ShowHistory,
                MenuAction::SetDailyLimit,
                MenuAction::EnvironmentCheck,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::GenerateEmailQueue => {
                    if let Err(e) = self.generate_queue_interactive(Channel::Email).await {
                        error!("Email queue generation failed: {}", e);
                    }
                }
                MenuAction::GenerateWhatsappQueue => {
                    if let Err(e) = self.generate_queue_interactive(Channel::Whatsapp).await {
                        error!("WhatsApp queue generation failed: {}", e);
                    }
                }
                MenuAction::RunEmailDispatch => {
                    if let Err(e) = self.run_dispatch_interactive(Channel::Email).await {
                        error!("Email dispatch failed: {}", e);
                    }
                }
                MenuAction::RunWhatsappDispatch => {
                    if let Err(e) = self.run_dispatch_interactive(Channel::Whatsapp).await {
                        error!("WhatsApp dispatch failed: {}", e);
                    }
                }
                MenuAction::ShowStats => {
                    if let Err(e) = self.show_database_stats().await {
                        error!("Failed to show stats: {}", e);
                    }
                }
                MenuAction::ShowHistory => {
                    if let Err(e) = self.show_recent_history().await {
                        error!("Failed to show history: {}", e);
                    }
                }
                MenuAction::SetDailyLimit => {
                    if let Err(e) = self.set_daily_limit_interactive().await {
                        error!("Failed to update daily limit: {}", e);
                    }
                }
                MenuAction::EnvironmentCheck => {
                    if let Err(e) = self.environment_check().await {
                        error!("Environment check failed: {}", e);
                    }
                }
                MenuAction::Exit => {
                    println!("\n👋 Thanks for using Geobooker Outreach!");
                    break;
                }
            }
        }

        Ok(())
    }
}
