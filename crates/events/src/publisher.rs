//! Best-effort publication of [`ProgressEvent`]s.
//!
//! Progress notification is advisory: the converted file is what the client
//! is waiting for. [`ProgressPublisher::publish`] and
//! [`ProgressPublisher::publish_terminal`] therefore never fail; broker
//! errors are logged and dropped. No retry is attempted.

use std::sync::Arc;

use pdfrelay_core::event::ProgressEvent;

use crate::channel::{ChannelError, ProgressChannel};

/// Sends progress events for any number of jobs on one named channel.
///
/// Cheap to share via `Arc`; the underlying [`ProgressChannel`] is safe for
/// concurrent use.
pub struct ProgressPublisher {
    channel: Arc<dyn ProgressChannel>,
    channel_name: String,
}

impl ProgressPublisher {
    pub fn new(channel: Arc<dyn ProgressChannel>, channel_name: impl Into<String>) -> Self {
        Self {
            channel,
            channel_name: channel_name.into(),
        }
    }

    /// Encode and send one event, reporting broker failures to the caller.
    pub async fn try_publish(&self, event: &ProgressEvent) -> Result<(), ChannelError> {
        let payload = event
            .to_payload()
            .map_err(|e| ChannelError::Unavailable(format!("failed to encode event: {e}")))?;
        self.channel.publish(&self.channel_name, payload).await
    }

    /// Announce that `page` (1-based) of `job_id` has completed.
    pub async fn publish(&self, job_id: &str, page: i64) {
        self.send(ProgressEvent::page_completed(job_id, page)).await;
    }

    /// Announce that `job_id` has finished, successfully or not.
    pub async fn publish_terminal(&self, job_id: &str) {
        self.send(ProgressEvent::terminal(job_id)).await;
    }

    async fn send(&self, event: ProgressEvent) {
        match self.try_publish(&event).await {
            Ok(()) => {
                tracing::debug!(
                    filename = %event.filename,
                    page = event.page,
                    channel = %self.channel_name,
                    "Published progress event",
                );
            }
            Err(e) => {
                tracing::warn!(
                    filename = %event.filename,
                    page = event.page,
                    channel = %self.channel_name,
                    error = %e,
                    "Failed to publish progress event",
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
