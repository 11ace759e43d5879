//! Progress publication over a pub/sub channel.
//!
//! - [`ProgressChannel`] -- the broker seam: publish a text message on a
//!   named channel.
//! - [`RedisChannel`] -- production broker backed by Redis `PUBLISH`.
//! - [`EventBus`] -- in-process broker backed by `tokio::sync::broadcast`.
//! - [`ProgressPublisher`] -- encodes [`ProgressEvent`]s and sends them,
//!   logging and swallowing broker failures.
//!
//! [`ProgressEvent`]: pdfrelay_core::event::ProgressEvent

pub mod bus;
pub mod channel;
pub mod publisher;
pub mod redis_channel;

pub use bus::{ChannelMessage, EventBus};
pub use channel::{ChannelError, ProgressChannel};
pub use publisher::ProgressPublisher;
pub use redis_channel::{RedisChannel, RedisConfig};
