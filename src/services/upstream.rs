//! Transport to the ingestion service: the event collection and the camera
//! snapshot. Both are plain GETs without retries; callers decide what a
//! failure means for their state.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::events::{EventRecord, decode_collection};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to decode event collection: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Raw image payload; the bytes are never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>, UpstreamError>;
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<SnapshotImage, UpstreamError>;
}

/// HTTP client for `GET /events/` and `GET /cameras/{id}/snapshot`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    camera_id: u32,
}

impl HttpUpstream {
    pub fn new(base_url: &str, camera_id: u32, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            camera_id,
        })
    }

    pub fn events_url(&self) -> String {
        format!("{}/events/", self.base_url)
    }

    pub fn snapshot_url(&self) -> String {
        format!("{}/cameras/{}/snapshot", self.base_url, self.camera_id)
    }

    async fn get_success(&self, url: &str) -> Result<reqwest::Response, UpstreamError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        Ok(response)
    }
}

#[async_trait]
impl EventSource for HttpUpstream {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>, UpstreamError> {
        let url = self.events_url();
        let body = self.get_success(&url).await?.bytes().await?;
        let events = decode_collection(&body)?;
        debug!(url = %url, count = events.len(), "Fetched event collection.");
        Ok(events)
    }
}

#[async_trait]
impl SnapshotSource for HttpUpstream {
    async fn fetch_snapshot(&self) -> Result<SnapshotImage, UpstreamError> {
        let url = self.snapshot_url();
        let response = self.get_success(&url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Fetched camera snapshot.");
        Ok(SnapshotImage {
            bytes,
            content_type,
        })
    }
}
