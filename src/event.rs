//! Upload events handed to an external logger

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Request details the serving layer knows about an upload
#[derive(Clone, Debug, Default)]
pub struct UploadContext {
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Emitted once per successful upload, after its alias exists
#[derive(Clone, Debug, Serialize)]
pub struct UploadEvent {
    pub timestamp: DateTime<Utc>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub original_name: String,
    /// Public ID including extension
    pub id: String,
    /// Content hash, hex
    pub hash: String,
    pub size: u64,
}

/// Receiver of upload events.
///
/// Recording is fire-and-forget: a sink reports its own failures and never
/// fails the upload.
pub trait UploadSink: Send + Sync {
    fn record(&self, event: &UploadEvent);
}

/// Sink that emits each event as a structured `tracing` record
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl UploadSink for TracingSink {
    fn record(&self, event: &UploadEvent) {
        info!(
            target: "upbox::uploads",
            id = %event.id,
            hash = %event.hash,
            size = event.size,
            original_name = %event.original_name,
            remote_addr = event.remote_addr.as_deref().unwrap_or(""),
            user_agent = event.user_agent.as_deref().unwrap_or(""),
            referer = event.referer.as_deref().unwrap_or(""),
            timestamp = %event.timestamp.to_rfc3339(),
            "upload"
        );
    }
}
