use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::services::upstream::{SnapshotImage, SnapshotSource, UpstreamError};

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub image: SnapshotImage,
    pub fetched_at: DateTime<Utc>,
}

/// On-demand camera snapshot, independent of the event collection.
/// A failed fetch is logged and leaves the previous snapshot in place.
pub struct SnapshotChannel {
    source: Arc<dyn SnapshotSource>,
    latest: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotChannel {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            latest: RwLock::new(None),
        }
    }

    pub async fn fetch_latest(&self) -> Result<Arc<Snapshot>, UpstreamError> {
        match self.source.fetch_snapshot().await {
            Ok(image) => {
                let snapshot = Arc::new(Snapshot {
                    image,
                    fetched_at: Utc::now(),
                });
                *self.latest.write().await = Some(snapshot.clone());
                info!(
                    size = snapshot.image.bytes.len(),
                    content_type = ?snapshot.image.content_type,
                    "Camera snapshot updated."
                );
                Ok(snapshot)
            }
            Err(e) => {
                let retained = self.latest.read().await.is_some();
                warn!(error = %e, retained, "Snapshot fetch failed; keeping previous snapshot.");
                Err(e)
            }
        }
    }

    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().await.clone()
    }
}
