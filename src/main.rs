// src/main.rs
use models::{ConsoleApp, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod console;
mod database;
mod dispatcher;
mod models;
mod queue;
mod quota;
mod sender;
mod server;
mod templates;

use config::{load_config, Config};
use database::create_db_pool;
use server::build_rocket;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let (config, config_error) = match load_config("config.yml").await {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Setup logging
    std::env::set_var(
        "RUST_LOG",
        format!(
            "geobooker_outreach={},rocket=warn,hyper=warn",
            config.logging.level
        ),
    );
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Some(e) = config_error {
        warn!("Failed to load config.yml: {}. Using defaults.", e);
    }

    // Initialize database
    info!("Initializing database...");
    let db_pool = create_db_pool(&config.database.path).await?;

    let console_mode = std::env::var("OUTREACH_CONSOLE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if console_mode {
        let app = ConsoleApp::new(config, db_pool);

        // Add graceful shutdown
        tokio::select! {
            result = app.run() => {
                result?;
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down gracefully...");
            }
        }
    } else {
        info!(
            "Starting HTTP server on {}:{}",
            config.server.host, config.server.port
        );
        build_rocket(config, db_pool).launch().await?;
    }

    Ok(())
}
