mod bootstrap;
mod health;

use anyhow::Result;
use secrecy::ExposeSecret;
use storefront_core::config::{AppConfig, LoadOptions};
use storefront_discord::gateway;

fn init_logging(config: &AppConfig) {
    use storefront_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config);

    health::spawn(&app.config.server.bind_address, app.config.server.port).await?;

    let mut client =
        gateway::connect(app.config.discord.token.expose_secret(), app.gateway_handler()).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "storefront gateway connecting"
    );

    tokio::select! {
        result = client.start() => result?,
        result = wait_for_shutdown() => result?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "storefront-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
