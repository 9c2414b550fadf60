use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub relay: RelayConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    pub listen_address: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Cameras the relay may reach. Empty allows any host.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    /// Answer cross-origin requests. Off when the UI is served same-origin.
    #[serde(default)]
    pub cors: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read configuration file")?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)
            .context("Failed to parse YAML configuration")?;

        Ok(config)
    }
}

impl RelayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn allows(&self, host: &str) -> bool {
        self.allowed_hosts.is_empty()
            || self
                .allowed_hosts
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}
