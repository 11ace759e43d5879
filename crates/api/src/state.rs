use std::sync::Arc;

use pdfrelay_events::ProgressPublisher;
use pdfrelay_worker::{JobRunner, ScratchSpace};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Progress publisher; the only resource shared between requests.
    pub publisher: Arc<ProgressPublisher>,
    /// Launches conversion engine processes.
    pub runner: Arc<JobRunner>,
    /// Where per-request scratch directories are allocated.
    pub scratch: Arc<ScratchSpace>,
}
