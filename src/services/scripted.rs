//! In-process stand-ins for the ingestion service, used by unit tests.
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tokio::sync::oneshot;

use super::upstream::{EventSource, SnapshotImage, SnapshotSource, UpstreamError};
use crate::events::EventRecord;

enum Step<T> {
    Ready(Result<T, UpstreamError>),
    /// Resolves only once the paired sender fires (or is dropped).
    Gated(oneshot::Receiver<()>, Result<T, UpstreamError>),
}

/// Replays queued responses in call order.
pub(crate) struct Scripted<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    calls: AtomicUsize,
}

impl<T> Scripted<T> {
    pub(crate) fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn respond(self, result: Result<T, UpstreamError>) -> Self {
        self.steps.lock().unwrap().push_back(Step::Ready(result));
        self
    }

    pub(crate) fn respond_when(
        self,
        gate: oneshot::Receiver<()>,
        result: Result<T, UpstreamError>,
    ) -> Self {
        self.steps.lock().unwrap().push_back(Step::Gated(gate, result));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<T, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Ready(result)) => result,
            Some(Step::Gated(gate, result)) => {
                let _ = gate.await;
                result
            }
            None => Err(bad_gateway()),
        }
    }
}

pub(crate) fn bad_gateway() -> UpstreamError {
    UpstreamError::Status(StatusCode::BAD_GATEWAY)
}

pub(crate) fn image(bytes: &'static [u8]) -> SnapshotImage {
    SnapshotImage {
        bytes: Bytes::from_static(bytes),
        content_type: Some("image/png".to_string()),
    }
}

#[async_trait]
impl EventSource for Scripted<Vec<EventRecord>> {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>, UpstreamError> {
        self.next().await
    }
}

#[async_trait]
impl SnapshotSource for Scripted<SnapshotImage> {
    async fn fetch_snapshot(&self) -> Result<SnapshotImage, UpstreamError> {
        self.next().await
    }
}
