use reqwest::{Client, Response};
use std::sync::Arc;
use url::Url;

use crate::auth::{AuthMode, CredentialAttacher};
use crate::camera::settings::ConnectionSettings;
use crate::cgi::{
    extract_flat_values, parse_key_value, OverlayDescriptor, ParsedResponse, Preset, PtzCode,
    PtzCommand, SystemInfo, Value,
};
use crate::error::{CameraError, Result};

/// Key aliases tried, in order, for the software version. Firmware
/// disagrees on casing.
const SOFTWARE_VERSION_KEYS: [&str; 3] = ["version", "Version", "Build"];

/// CGI scripts under `/cgi-bin/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    MagicBox,
    ConfigManager,
    Snapshot,
    Ptz,
    MjpgVideo,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MagicBox => "magicBox",
            Self::ConfigManager => "configManager",
            Self::Snapshot => "snapshot",
            Self::Ptz => "ptz",
            Self::MjpgVideo => "mjpg/video",
        }
    }
}

/// Protocol client for one camera.
///
/// Immutable after construction and cheap to clone; share it freely across
/// tasks. Reconnecting means building a new client.
///
/// Operations come in two groups. Best-effort ones (identity, snapshot,
/// PTZ, reboot, config writes) log failures and return `None`/`false`.
/// Propagating ones (config and status reads) return `Result` so the caller
/// can report the failure.
#[derive(Clone)]
pub struct CameraClient {
    base_url: Url,
    http_client: Client,
    auth: Arc<dyn CredentialAttacher>,
    debug: bool,
}

impl CameraClient {
    pub fn new(settings: &ConnectionSettings, mode: AuthMode) -> Result<Self> {
        settings.validate()?;

        let (base_url, auth) = mode.build(settings)?;
        let http_client = Client::builder().timeout(settings.timeout()).build()?;

        tracing::debug!("Camera client for {} using {:?}", base_url, auth);

        let mut client = Self::with_attacher(base_url, auth, http_client);
        client.debug = settings.debug;
        Ok(client)
    }

    /// Build from parts, e.g. to plug in a custom credential strategy.
    pub fn with_attacher(base_url: Url, auth: Arc<dyn CredentialAttacher>, http_client: Client) -> Self {
        Self {
            base_url,
            http_client,
            auth,
            debug: false,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/cgi-bin/{endpoint}.cgi?{params}`
    pub fn cgi_url<I, K, V>(&self, endpoint: Endpoint, params: I) -> Result<Url>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = Url::parse(&format!(
            "{}/cgi-bin/{}.cgi",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.as_str()
        ))?;

        let params: Vec<(K, V)> = params.into_iter().collect();
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
        }

        Ok(url)
    }

    /// URL of the MJPEG stream. Consuming the stream is up to the caller.
    pub fn mjpeg_url(&self, channel: u32, subtype: u32) -> Result<Url> {
        self.cgi_url(
            Endpoint::MjpgVideo,
            [("channel", channel.to_string()), ("subtype", subtype.to_string())],
        )
    }

    async fn fetch(&self, url: Url) -> Result<Response> {
        tracing::debug!("GET {}", url);

        let response = self.auth.send(&self.http_client, url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CameraError::Status(status));
        }

        Ok(response)
    }

    async fn fetch_text<I, K, V>(&self, endpoint: Endpoint, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.cgi_url(endpoint, params)?;
        let text = self.fetch(url).await?.text().await?;

        if self.debug {
            tracing::debug!("Camera response from {}: {}", endpoint.as_str(), text);
        } else {
            tracing::trace!("Camera response from {}: {}", endpoint.as_str(), text);
        }

        Ok(text)
    }

    async fn fetch_parsed<I, K, V>(&self, endpoint: Endpoint, params: I) -> Result<ParsedResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let text = self.fetch_text(endpoint, params).await?;
        Ok(parse_key_value(&text))
    }

    async fn magic_box(&self, action: &str) -> Result<ParsedResponse> {
        self.fetch_parsed(Endpoint::MagicBox, [("action", action)]).await
    }
}

// Best-effort operations: failures are logged and absorbed.
impl CameraClient {
    /// Succeeds only when a non-empty device type comes back.
    pub async fn test_connection(&self) -> bool {
        self.get_device_type()
            .await
            .is_some_and(|device_type| !device_type.is_empty())
    }

    pub async fn get_device_type(&self) -> Option<String> {
        let parsed = absorb("getDeviceType", self.magic_box("getDeviceType").await)?;
        parsed.get("type").map(Value::to_string)
    }

    pub async fn get_serial_number(&self) -> Option<String> {
        let parsed = absorb("getSerialNo", self.magic_box("getSerialNo").await)?;
        parsed.get("sn").map(Value::to_string)
    }

    pub async fn get_hardware_version(&self) -> Option<String> {
        let parsed = absorb("getHardwareVersion", self.magic_box("getHardwareVersion").await)?;
        parsed.get("version").map(Value::to_string)
    }

    pub async fn get_software_version(&self) -> Option<String> {
        let parsed = absorb("getSoftwareVersion", self.magic_box("getSoftwareVersion").await)?;
        let flat = extract_flat_values(&parsed, "");
        SOFTWARE_VERSION_KEYS
            .iter()
            .find_map(|key| flat.get(*key).cloned())
    }

    /// The four identity calls run concurrently; each missing answer just
    /// leaves its field empty.
    pub async fn get_system_info(&self) -> SystemInfo {
        let (device_type, serial_number, hardware_version, software_version) = futures::join!(
            self.get_device_type(),
            self.get_serial_number(),
            self.get_hardware_version(),
            self.get_software_version(),
        );

        SystemInfo {
            device_type,
            serial_number,
            hardware_version,
            software_version,
        }
    }

    /// Write config values. Success means the reply mentions "ok" in any
    /// casing.
    pub async fn set_config<I, K, V>(&self, params: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = vec![("action".to_string(), "setConfig".to_string())];
        query.extend(
            params
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );

        absorb("setConfig", self.fetch_text(Endpoint::ConfigManager, query).await)
            .is_some_and(|text| reply_is_ok(&text))
    }

    pub async fn set_overlay(&self, channel: usize, overlay: &OverlayDescriptor) -> bool {
        self.set_config(overlay.to_config_params(channel)).await
    }

    /// JPEG bytes from `snapshot.cgi`.
    pub async fn get_snapshot(&self, channel: u32) -> Option<Vec<u8>> {
        let result = async {
            let url = self.cgi_url(Endpoint::Snapshot, [("channel", channel.to_string())])?;
            let bytes = self.fetch(url).await?.bytes().await?;
            Ok::<_, CameraError>(bytes.to_vec())
        }
        .await;

        let data = absorb("snapshot", result)?;
        tracing::debug!("Captured {} bytes from channel {}", data.len(), channel);
        Some(data)
    }

    pub async fn ptz_control(&self, command: &PtzCommand) -> bool {
        absorb(
            "ptz",
            self.fetch_text(Endpoint::Ptz, command.query_params()).await,
        )
        .is_some_and(|text| reply_is_ok(&text))
    }

    pub async fn goto_preset(&self, channel: u32, index: i32) -> bool {
        self.ptz_control(&PtzCommand::preset(PtzCode::GotoPreset, channel, index))
            .await
    }

    pub async fn set_preset(&self, channel: u32, index: i32) -> bool {
        self.ptz_control(&PtzCommand::preset(PtzCode::SetPreset, channel, index))
            .await
    }

    pub async fn clear_preset(&self, channel: u32, index: i32) -> bool {
        self.ptz_control(&PtzCommand::preset(PtzCode::ClearPreset, channel, index))
            .await
    }

    /// The camera drops the connection while restarting, so completing the
    /// request is all that is checked.
    pub async fn reboot(&self) -> bool {
        let result = async {
            let url = self.cgi_url(Endpoint::MagicBox, [("action", "reboot")])?;
            self.fetch(url).await
        }
        .await;

        absorb("reboot", result).is_some()
    }
}

// Propagating operations: the caller decides how to report failures.
impl CameraClient {
    pub async fn get_config(&self, name: &str) -> Result<ParsedResponse> {
        self.fetch_parsed(
            Endpoint::ConfigManager,
            [("action", "getConfig"), ("name", name)],
        )
        .await
    }

    /// Name, timestamp and logo overlays for `channel`, from the
    /// `VideoWidget` table.
    pub async fn get_overlays(&self, channel: usize) -> Result<Vec<OverlayDescriptor>> {
        let parsed = self.get_config("VideoWidget").await?;
        Ok(OverlayDescriptor::from_config(&parsed, channel))
    }

    pub async fn get_presets(&self, channel: u32) -> Result<Vec<Preset>> {
        let parsed = self
            .fetch_parsed(
                Endpoint::Ptz,
                [("action", "getPresets".to_string()), ("channel", channel.to_string())],
            )
            .await?;
        Ok(Preset::from_response(&parsed))
    }

    pub async fn get_ptz_status(&self, channel: u32) -> Result<ParsedResponse> {
        self.fetch_parsed(
            Endpoint::Ptz,
            [("action", "getStatus".to_string()), ("channel", channel.to_string())],
        )
        .await
    }
}

fn absorb<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Camera {} failed: {}", operation, e);
            None
        }
    }
}

/// Loose confirmation check: firmware replies "OK", "ok" or embeds it in
/// longer text.
fn reply_is_ok(text: &str) -> bool {
    text.to_ascii_lowercase().contains("ok")
}
