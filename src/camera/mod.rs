pub mod client;
pub mod settings;
pub mod snapshot;

pub use client::{CameraClient, Endpoint};
pub use settings::ConnectionSettings;
pub use snapshot::{Frame, SnapshotFeed};
