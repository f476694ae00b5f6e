//! # Chatline
//!
//! Application entry point. Initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database pool, migrations and media storage
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chatline::config::Settings;
use chatline::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    chatline::telemetry::init_tracing();

    info!("Starting Chatline...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
