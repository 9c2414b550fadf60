use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::camera::CameraClient;

/// One snapshot, tagged with the order its request was issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ticket: u64,
    pub data: Vec<u8>,
}

/// Holds the most recent snapshot for a channel when polling.
///
/// Requests may overlap and finish out of order. A response only replaces
/// the stored frame if its request was issued after the stored one, so a
/// slow stale fetch never overwrites a fresher image.
#[derive(Clone)]
pub struct SnapshotFeed {
    client: CameraClient,
    channel: u32,
    issued: Arc<AtomicU64>,
    latest: Arc<RwLock<Option<Frame>>>,
}

impl SnapshotFeed {
    pub fn new(client: CameraClient, channel: u32) -> Self {
        Self {
            client,
            channel,
            issued: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch a snapshot. Returns `true` if it became the latest frame.
    pub async fn refresh(&self) -> bool {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(data) = self.client.get_snapshot(self.channel).await else {
            return false;
        };

        let mut latest = self.latest.write().await;
        if latest.as_ref().is_some_and(|frame| frame.ticket > ticket) {
            tracing::debug!("Discarding stale snapshot #{} for channel {}", ticket, self.channel);
            return false;
        }

        *latest = Some(Frame { ticket, data });
        true
    }

    pub async fn latest(&self) -> Option<Frame> {
        self.latest.read().await.clone()
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }
}
