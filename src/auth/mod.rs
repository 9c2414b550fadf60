//! How outgoing camera requests acquire credentials.
//!
//! Two strategies exist and a client uses exactly one, chosen when it is
//! built:
//!
//! * [`DigestAuth`] talks to the camera directly and answers its HTTP Digest
//!   challenge itself.
//! * [`RelayAuth`] sends every request to a same-origin relay with the
//!   credentials in an `x-camera-auth` header; the relay does the digest
//!   handshake against the camera.
//!
//! Both hand back the camera's final response, so callers see the same
//! behavior either way.

pub mod digest;
pub mod relay;

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::camera::settings::ConnectionSettings;
use crate::error::{CameraError, Result};

pub use digest::{Algorithm, DigestAuth, DigestChallenge};
pub use relay::{RelayAuth, CAMERA_AUTH_HEADER};

#[async_trait]
pub trait CredentialAttacher: Send + Sync + fmt::Debug {
    /// Issue an authenticated GET for `url` and return the final response.
    ///
    /// Status codes are not interpreted here; a 401 that survives the
    /// strategy's handshake is returned like any other response.
    async fn send(&self, http: &Client, url: Url) -> Result<Response>;
}

/// Which strategy a client is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Direct,
    Relayed { relay_base: Url },
}

impl AuthMode {
    /// Resolve the base URL every CGI path hangs off, and the strategy
    /// that authenticates requests to it.
    pub fn build(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<(Url, Arc<dyn CredentialAttacher>)> {
        match self {
            AuthMode::Direct => {
                let scheme = if settings.secure { "https" } else { "http" };
                let base = Url::parse(&format!(
                    "{}://{}:{}",
                    scheme,
                    url_host(&settings.host),
                    settings.port
                ))?;
                let auth = DigestAuth::new(&settings.username, &settings.password);
                Ok((base, Arc::new(auth)))
            }
            AuthMode::Relayed { relay_base } => {
                if relay_base.cannot_be_a_base() {
                    return Err(CameraError::Settings(format!(
                        "relay base {} cannot carry a path",
                        relay_base
                    )));
                }
                let base = Url::parse(&format!(
                    "{}/proxy/{}/{}",
                    relay_base.as_str().trim_end_matches('/'),
                    settings.host,
                    settings.port
                ))?;
                let auth = RelayAuth::new(&settings.username, &settings.password)?;
                Ok((base, Arc::new(auth)))
            }
        }
    }
}

/// Bracket bare IPv6 literals so they can sit in an authority.
pub(crate) fn url_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}
