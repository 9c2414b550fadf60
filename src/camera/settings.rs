use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::{CameraError, Result};

/// Everything needed to reach one camera. The password lives only in
/// memory for the session and is never serialized.
#[derive(Clone, Deserialize)]
pub struct ConnectionSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Selects `https` for direct connections. Ignored when relayed.
    #[serde(default)]
    pub secure: bool,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Log raw camera responses at debug level.
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    80
}

fn default_timeout_secs() -> u64 {
    10
}

impl ConnectionSettings {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            secure: false,
            username: username.to_string(),
            password: password.to_string(),
            debug: false,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Load from `CAMERA_HOST`, `CAMERA_PORT`, `CAMERA_USERNAME`,
    /// `CAMERA_PASSWORD`, `CAMERA_SECURE`, `CAMERA_DEBUG` and
    /// `CAMERA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let settings: ConnectionSettings = config::Config::builder()
            .add_source(config::Environment::with_prefix("CAMERA").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CameraError::Settings(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(CameraError::Settings("host is empty".to_string()));
        }
        if host.contains(['/', '?', '#', '@']) || host.contains(char::is_whitespace) {
            return Err(CameraError::Settings(format!("host {:?} is not a bare host name", self.host)));
        }
        if self.port == 0 {
            return Err(CameraError::Settings("port must be between 1 and 65535".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("debug", &self.debug)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
