//! Redis-backed progress channel.
//!
//! Uses a [`ConnectionManager`], which multiplexes one connection across
//! clones and reconnects on its own after a broker restart. Each publish
//! clones the manager, so concurrent requests never contend on a lock.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use crate::channel::{ChannelError, ProgressChannel};

/// Connection settings for the Redis broker.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl RedisConfig {
    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: (!self.password.is_empty()).then(|| self.password.clone()),
                ..Default::default()
            },
        }
    }
}

/// Publishes progress messages with Redis `PUBLISH`.
#[derive(Clone)]
pub struct RedisChannel {
    conn: ConnectionManager,
}

impl RedisChannel {
    /// Connect to the broker.
    ///
    /// Fails if the broker cannot be reached now; later outages surface as
    /// [`ChannelError::Unavailable`] on publish.
    pub async fn connect(config: &RedisConfig) -> Result<Self, ChannelError> {
        let client = redis::Client::open(config.connection_info()).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!(host = %config.host, port = config.port, "Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ProgressChannel for RedisChannel {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(channel, payload).await.map_err(unavailable)?;
        tracing::trace!(channel, receivers, "Published to Redis");
        Ok(())
    }
}

fn unavailable(err: redis::RedisError) -> ChannelError {
    ChannelError::Unavailable(err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
