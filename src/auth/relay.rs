use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::HeaderValue;
use reqwest::{Client, Response};
use std::fmt;
use url::Url;

use crate::auth::CredentialAttacher;
use crate::error::{CameraError, Result};

/// Header carrying `Basic base64(username:password)` to the relay.
pub const CAMERA_AUTH_HEADER: &str = "x-camera-auth";

pub fn encode_credentials(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", username, password)))
}

/// Inverse of [`encode_credentials`]. The password may itself contain `:`.
pub fn decode_credentials(header: &str) -> Result<(String, String)> {
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("Basic") => token.trim(),
        _ => return Err(CameraError::RelayAuth("expected Basic token".to_string())),
    };

    let decoded = BASE64
        .decode(token)
        .map_err(|e| CameraError::RelayAuth(format!("invalid base64: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| CameraError::RelayAuth("credentials are not UTF-8".to_string()))?;

    match decoded.split_once(':') {
        Some((username, password)) => Ok((username.to_string(), password.to_string())),
        None => Err(CameraError::RelayAuth("missing ':' separator".to_string())),
    }
}

/// Relayed strategy: no digest work happens here, the relay does it.
#[derive(Clone)]
pub struct RelayAuth {
    header_value: HeaderValue,
}

impl RelayAuth {
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let mut header_value = HeaderValue::from_str(&encode_credentials(username, password))
            .map_err(|e| CameraError::RelayAuth(e.to_string()))?;
        header_value.set_sensitive(true);
        Ok(Self { header_value })
    }
}

impl fmt::Debug for RelayAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayAuth").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialAttacher for RelayAuth {
    async fn send(&self, http: &Client, url: Url) -> Result<Response> {
        let response = http
            .get(url)
            .header(CAMERA_AUTH_HEADER, self.header_value.clone())
            .send()
            .await?;
        Ok(response)
    }
}
