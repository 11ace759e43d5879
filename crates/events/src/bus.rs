//! In-process pub/sub backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] implements [`ProgressChannel`] without any external broker.
//! Every subscriber sees every message on every channel name and filters
//! for itself.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::channel::{ChannelError, ProgressChannel};

/// A message as delivered to in-process subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel: String,
    pub payload: String,
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out broker.
pub struct EventBus {
    sender: broadcast::Sender<ChannelMessage>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all messages published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl ProgressChannel for EventBus {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), ChannelError> {
        // A SendError only means there are zero receivers, same as a Redis
        // PUBLISH that reaches nobody.
        let _ = self.sender.send(ChannelMessage {
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
