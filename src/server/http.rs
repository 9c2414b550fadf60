use anyhow::{Context, Result};
use axum::http::{HeaderName, Method};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::CAMERA_AUTH_HEADER;
use crate::config::RelayConfig;
use crate::server::routes::{create_router, AppState};

pub async fn start_server(config: RelayConfig, base_url: String) -> Result<()> {
    let addr: SocketAddr = config
        .listen_address
        .parse()
        .context("Failed to parse listen address")?;

    // No overall timeout: MJPEG streams stay open indefinitely
    let http_client = Client::builder()
        .connect_timeout(config.connect_timeout())
        .build()
        .context("Failed to create HTTP client")?;

    let cors = config.cors;
    let state = AppState {
        http_client,
        config: Arc::new(config),
    };

    let mut app = create_router(state).layer(TraceLayer::new_for_http());
    if cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers([HeaderName::from_static(CAMERA_AUTH_HEADER)]),
        );
    }

    tracing::info!("Starting camera relay on {}", addr);
    tracing::info!("Relay cameras at: {}/proxy/{{host}}/{{port}}/cgi-bin/...", base_url);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
