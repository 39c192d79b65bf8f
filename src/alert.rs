//! User-facing alerts for fatal fetch failures.

use tokio::sync::mpsc;
use tracing::error;

use crate::error::FetchError;

/// Message shown to the user for any fatal fetch failure.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

pub trait AlertSink: Send + Sync {
    fn alert(&self, error: &FetchError);
}

/// Headless sink: the alert is an error-level log line.
pub struct LogAlert;

impl AlertSink for LogAlert {
    fn alert(&self, error: &FetchError) {
        error!(alert = true, "{UNEXPECTED_ERROR} ({error})");
    }
}

/// Forwards alerts to whatever owns the screen.
pub struct ChannelAlert {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelAlert {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlert {
    fn alert(&self, error: &FetchError) {
        let message = match error {
            FetchError::TimeoutExceeded { .. } => format!("{UNEXPECTED_ERROR} The request timed out."),
            _ => UNEXPECTED_ERROR.to_string(),
        };
        // Receiver gone means the screen is shutting down.
        let _ = self.tx.send(message);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every alert for inspection.
    #[derive(Default)]
    pub(crate) struct RecordingAlert(pub Mutex<Vec<String>>);

    impl RecordingAlert {
        pub fn count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl AlertSink for RecordingAlert {
        fn alert(&self, error: &FetchError) {
            self.0.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn channel_alert_mentions_timeouts() {
        let (sink, mut rx) = ChannelAlert::new();
        sink.alert(&FetchError::NonRetryableError { status: 403, body: String::new() });
        sink.alert(&FetchError::TimeoutExceeded { elapsed: std::time::Duration::from_secs(600) });

        assert_eq!(rx.try_recv().unwrap(), UNEXPECTED_ERROR);
        assert!(rx.try_recv().unwrap().ends_with("timed out."));
    }
}
