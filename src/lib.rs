//! Protocol client for Amcrest/Dahua-family IP cameras and their CGI HTTP
//! API, plus the same-origin relay that performs Digest authentication on a
//! browser client's behalf.

pub mod auth;
pub mod camera;
pub mod cgi;
pub mod config;
pub mod error;
pub mod server;

pub use auth::{AuthMode, CredentialAttacher};
pub use camera::{CameraClient, ConnectionSettings, SnapshotFeed};
pub use error::{CameraError, Result};
