use amcrest_admin::config;
use amcrest_admin::server;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config/relay.yaml".to_string());

    let config = config::AppConfig::load_from_file(&config_path)
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("amcrest_admin={},tower_http=debug", config.relay.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Amcrest camera relay");

    if !config.relay.allowed_hosts.is_empty() {
        tracing::info!("Relay restricted to {} camera hosts", config.relay.allowed_hosts.len());
    }

    // Determine base URL for the relay
    let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| {
        let port = config
            .relay
            .listen_address
            .rsplit(':')
            .next()
            .unwrap_or("80");
        match local_ip_address::local_ip() {
            Ok(ip) => format!("http://{}:{}", ip, port),
            Err(_) => format!("http://{}", config.relay.listen_address),
        }
    });

    tracing::info!("Relay base URL: {}", base_url);

    // Start the server
    server::start_server(config.relay, base_url).await?;

    Ok(())
}
