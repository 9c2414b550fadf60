// Probe a single camera through the protocol client
// Run with: CAMERA_HOST=192.168.1.108 CAMERA_USERNAME=admin CAMERA_PASSWORD=... cargo run --bin probe_camera
// Set CAMERA_RELAY_BASE=http://localhost:8080 to go through the relay instead.

use amcrest_admin::{AuthMode, CameraClient, ConnectionSettings};
use anyhow::Context;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let settings = ConnectionSettings::from_env().context("Failed to read CAMERA_* settings")?;

    let mode = match std::env::var("CAMERA_RELAY_BASE") {
        Ok(base) => AuthMode::Relayed {
            relay_base: Url::parse(&base).context("Invalid CAMERA_RELAY_BASE")?,
        },
        Err(_) => AuthMode::Direct,
    };

    let camera = CameraClient::new(&settings, mode)?;
    println!("Camera base URL: {}", camera.base_url());

    println!("\n=== Testing connection ===");
    if !camera.test_connection().await {
        eprintln!("Connection test failed");
        return Ok(());
    }
    println!("Connection OK");

    println!("\n=== System info ===");
    let info = camera.get_system_info().await;
    println!("{}", serde_json::to_string_pretty(&info)?);

    println!("\n=== Overlays (channel 0) ===");
    match camera.get_overlays(0).await {
        Ok(overlays) => println!("{}", serde_json::to_string_pretty(&overlays)?),
        Err(e) => eprintln!("VideoWidget Error: {}", e),
    }

    println!("\n=== PTZ presets (channel 0) ===");
    match camera.get_presets(0).await {
        Ok(presets) => {
            for preset in presets {
                println!("{:>3}  {}", preset.index, preset.name);
            }
        }
        Err(e) => eprintln!("getPresets Error: {}", e),
    }

    println!("\n=== Snapshot (channel 1) ===");
    match camera.get_snapshot(1).await {
        Some(image) => println!("Received {} bytes", image.len()),
        None => eprintln!("Snapshot failed"),
    }

    println!("\nMJPEG stream: {}", camera.mjpeg_url(1, 1)?);

    Ok(())
}
