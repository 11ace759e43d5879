//! The pub/sub seam between progress publication and the broker.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The broker could not be reached or rejected the message.
    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

/// A broker that can deliver text messages to subscribers of a channel.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait ProgressChannel: Send + Sync {
    /// Publish `payload` on `channel`.
    async fn publish(&self, channel: &str, payload: String) -> Result<(), ChannelError>;
}
