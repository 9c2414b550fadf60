//! Error types for the camera protocol client.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("camera returned HTTP {0}")]
    Status(StatusCode),

    #[error("URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid connection settings: {0}")]
    Settings(String),

    #[error("digest challenge: {0}")]
    Challenge(String),

    #[error("relay credential header: {0}")]
    RelayAuth(String),
}

impl CameraError {
    /// True for 401/403 responses. The caller cannot tell a wrong password
    /// apart from a rejected digest; both land here.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Status(StatusCode::UNAUTHORIZED) | Self::Status(StatusCode::FORBIDDEN)
        )
    }
}

pub type Result<T> = std::result::Result<T, CameraError>;
