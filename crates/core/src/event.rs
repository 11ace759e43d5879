//! Progress events published to subscribers while a conversion runs.

use serde::{Deserialize, Serialize};

/// Page value reserved for the "job finished" sentinel.
pub const TERMINAL_PAGE: i64 = -1;

/// One progress notification for a job.
///
/// Serialized as `{"filename": "...", "page": N}`. A positive `page` is the
/// 1-based count of pages completed so far; [`TERMINAL_PAGE`] marks the end
/// of the stream for that filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Job identity as seen by subscribers (the uploaded filename).
    pub filename: String,
    pub page: i64,
}

impl ProgressEvent {
    /// Event announcing that `page` (1-based) has completed.
    pub fn page_completed(filename: impl Into<String>, page: i64) -> Self {
        Self {
            filename: filename.into(),
            page,
        }
    }

    /// The terminal sentinel for `filename`.
    pub fn terminal(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            page: TERMINAL_PAGE,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.page == TERMINAL_PAGE
    }

    /// Encode as the JSON message sent on the pub/sub channel.
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
