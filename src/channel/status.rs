//! Connection status notification
//!
//! The manager reports connectivity health through a single injected sink.
//! Each call is a point-in-time notification; there is no queuing or
//! history. The default sink logs transitions via tracing.

use tracing::{info, warn};

/// Receiver for connection status transitions.
///
/// Called on every open (connected = true), close, and transport error
/// (connected = false). `reason` is set only for synchronous connect
/// failures and retry exhaustion.
pub trait StatusSink: Send + Sync {
    /// Observe a status transition
    fn connection_status_changed(&self, connected: bool, reason: Option<&str>);
}

/// Plain closures work as sinks
impl<F> StatusSink for F
where
    F: Fn(bool, Option<&str>) + Send + Sync,
{
    fn connection_status_changed(&self, connected: bool, reason: Option<&str>) {
        self(connected, reason)
    }
}

/// Default sink: logs every transition
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn connection_status_changed(&self, connected: bool, reason: Option<&str>) {
        if connected {
            info!("connected");
        } else {
            match reason {
                Some(reason) => warn!(reason, "disconnected"),
                None => info!("disconnected"),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_as_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();

        let sink = move |connected: bool, reason: Option<&str>| {
            assert!(!connected);
            assert_eq!(reason, Some("gone"));
            seen.fetch_add(1, Ordering::SeqCst);
        };

        StatusSink::connection_status_changed(&sink, false, Some("gone"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_log_sink_does_not_panic() {
        let sink = LogStatusSink;
        sink.connection_status_changed(true, None);
        sink.connection_status_changed(false, None);
        sink.connection_status_changed(false, Some("max reconnection attempts reached"));
    }
}
