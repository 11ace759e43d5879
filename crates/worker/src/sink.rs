//! Per-job receiver for engine log lines.

use std::sync::Arc;

use pdfrelay_core::progress;
use pdfrelay_events::ProgressPublisher;

/// Callback attached to one job's log stream.
///
/// Every line is echoed to the service log tagged with the job's filename.
/// Lines announcing a page are turned into progress events. The engine
/// reports the page it is starting (0-based), so the published count is
/// that number plus one.
pub struct LogSink {
    filename: Arc<str>,
    publisher: Arc<ProgressPublisher>,
}

impl LogSink {
    pub fn new(filename: &str, publisher: Arc<ProgressPublisher>) -> Self {
        Self {
            filename: Arc::from(filename),
            publisher,
        }
    }

    /// Handle one log line. Returns the page count published, if any.
    pub async fn on_line(&self, line: &str) -> Option<i64> {
        tracing::info!(filename = %self.filename, "{line}");

        match progress::extract_page(line) {
            Some(page) => {
                let completed = i64::from(page) + 1;
                self.publisher.publish(&self.filename, completed).await;
                Some(completed)
            }
            None => {
                if progress::has_marker(line) {
                    tracing::warn!(
                        filename = %self.filename,
                        line,
                        "Progress line without a page number, skipping",
                    );
                }
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pdfrelay_core::event::ProgressEvent;
    use pdfrelay_events::EventBus;

    use super::*;

    fn sink_with_bus() -> (LogSink, tokio::sync::broadcast::Receiver<pdfrelay_events::ChannelMessage>) {
        let bus = Arc::new(EventBus::default());
        let rx = bus.subscribe();
        let publisher = Arc::new(ProgressPublisher::new(bus, "progress"));
        (LogSink::new("scan.pdf", publisher), rx)
    }

    #[tokio::test]
    async fn page_line_publishes_next_page_count() {
        let (sink, mut rx) = sink_with_bus();

        assert_eq!(sink.on_line("    1 Rotations for page 0: 0.00").await, Some(1));

        let event: ProgressEvent = serde_json::from_str(&rx.recv().await.unwrap().payload).unwrap();
        assert_eq!(event, ProgressEvent::page_completed("scan.pdf", 1));
    }

    #[tokio::test]
    async fn other_lines_publish_nothing() {
        let (sink, mut rx) = sink_with_bus();

        assert_eq!(sink.on_line("Start processing 4 pages concurrently").await, None);
        assert_eq!(sink.on_line("Rotations for page ???").await, None);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pages_are_published_in_line_order() {
        let (sink, mut rx) = sink_with_bus();

        for line in ["Rotations for page 2", "noise", "Rotations for page 0", "Rotations for page 1"] {
            sink.on_line(line).await;
        }

        let mut pages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            let event: ProgressEvent = serde_json::from_str(&msg.payload).unwrap();
            pages.push(event.page);
        }
        assert_eq!(pages, [3, 1, 2]);
    }
}
