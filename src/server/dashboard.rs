use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::event_store::{EventCollection, EventStore};
use super::snapshot_channel::{Snapshot, SnapshotChannel};
use crate::aggregation::{DashboardSummary, SummaryOptions, summarize};
use crate::services::upstream::{EventSource, SnapshotSource, UpstreamError};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    /// False when a newer refresh completed first and this result was dropped.
    pub adopted: bool,
    pub fetched_events: usize,
}

/// Owns the dashboard state. `refresh_events` and `refresh_snapshot` are the
/// only mutators and never touch each other's state; every view is derived
/// on read from whatever collection is currently held.
pub struct DashboardController {
    events: Arc<EventStore>,
    snapshots: SnapshotChannel,
    event_source: Arc<dyn EventSource>,
    options: SummaryOptions,
}

impl DashboardController {
    pub fn new(
        event_source: Arc<dyn EventSource>,
        snapshot_source: Arc<dyn SnapshotSource>,
        options: SummaryOptions,
    ) -> Self {
        Self {
            events: EventStore::new(),
            snapshots: SnapshotChannel::new(snapshot_source),
            event_source,
            options,
        }
    }

    /// Fetches the full collection and replaces the held one. On failure the
    /// previous collection stays in place.
    pub async fn refresh_events(&self) -> Result<RefreshOutcome, UpstreamError> {
        let ticket = self.events.issue_ticket();
        match self.event_source.fetch_events().await {
            Ok(events) => {
                let fetched_events = events.len();
                let adopted = self.events.replace_if_newer(ticket, events).await;
                if adopted {
                    info!(ticket, total_events = fetched_events, "Event collection replaced.");
                } else {
                    debug!(ticket, "Event refresh superseded by a newer one.");
                }
                Ok(RefreshOutcome {
                    adopted,
                    fetched_events,
                })
            }
            Err(e) => {
                warn!(ticket, error = %e, "Event refresh failed; keeping previous collection.");
                Err(e)
            }
        }
    }

    pub async fn refresh_snapshot(&self) -> Result<Arc<Snapshot>, UpstreamError> {
        self.snapshots.fetch_latest().await
    }

    pub async fn summary(&self) -> DashboardSummary {
        let events = self.events.current().await;
        summarize(&events, self.options)
    }

    pub async fn events(&self) -> EventCollection {
        self.events.current().await
    }

    pub async fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.latest().await
    }

    /// Refreshes events every `period` until the returned task is aborted.
    /// The first refresh happens one period from now.
    pub fn spawn_periodic_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            info!(interval_seconds = period.as_secs(), "Periodic event refresh task started.");

            loop {
                ticker.tick().await;
                // Failures are already logged by refresh_events.
                let _ = controller.refresh_events().await;
            }
        })
    }
}
