//! Connection manager
//!
//! Owns one logical channel at a time, keyed by a session identifier:
//! - derives the endpoint from the configured server URL and the session id
//! - recovers from unclean closes with exponential backoff, bounded by an
//!   attempt budget
//! - decodes inbound frames into envelopes and routes them by kind
//! - reports every connectivity transition to an injected status sink
//!
//! Retry timers and channel readers are keyed by a generation counter
//! bumped on every connect/disconnect, so work belonging to a superseded
//! connection finds its generation stale and abandons itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::registry::{HandlerRegistry, MessageHandler};
use crate::channel::retry::RetryPolicy;
use crate::channel::status::{LogStatusSink, StatusSink};
use crate::channel::transport::{ChannelEvent, CloseKind, Transport, WsTransport};
use crate::error::{Error, Result};
use crate::protocol::Envelope;

// ─────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────

/// Settings for the connection manager
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Server base URL (ws:// or wss://)
    pub server_url: String,

    /// Path prefix the session id is appended to
    pub path_prefix: String,

    /// Timeout for a single open attempt
    pub connect_timeout: Duration,

    /// Reconnection policy
    pub retry: RetryPolicy,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8000".to_string(),
            path_prefix: "/ws".to_string(),
            connect_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Internal State
// ─────────────────────────────────────────────────────────────────

/// Mutable link state, guarded by one lock
struct LinkState {
    /// Intended session; None means no active or intended session
    session_id: Option<String>,

    /// Outbound side of the live channel; present iff the channel is open.
    /// Dropping the sender closes the underlying connection.
    outbound: Option<mpsc::UnboundedSender<String>>,

    /// Reconnection attempts since the last successful open
    attempts: u32,
}

struct Inner {
    settings: ChannelSettings,
    transport: Arc<dyn Transport>,
    registry: HandlerRegistry,
    sink: RwLock<Arc<dyn StatusSink>>,
    state: RwLock<LinkState>,

    /// Generation counter; bumped on every connect/disconnect
    epoch: AtomicU64,
}

// ─────────────────────────────────────────────────────────────────
// Connection Manager
// ─────────────────────────────────────────────────────────────────

/// Session-keyed channel manager with automatic reconnection
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Create a manager using the WebSocket transport
    pub fn new(settings: ChannelSettings) -> Self {
        Self::with_transport(settings, Arc::new(WsTransport))
    }

    /// Create a manager over a custom transport
    pub fn with_transport(settings: ChannelSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                transport,
                registry: HandlerRegistry::new(),
                sink: RwLock::new(Arc::new(LogStatusSink)),
                state: RwLock::new(LinkState {
                    session_id: None,
                    outbound: None,
                    attempts: 0,
                }),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the status sink
    pub fn set_status_sink(&self, sink: Arc<dyn StatusSink>) {
        *self.inner.sink.write() = sink;
    }

    /// Builder-style status sink injection
    pub fn with_status_sink(self, sink: Arc<dyn StatusSink>) -> Self {
        self.set_status_sink(sink);
        self
    }

    /// Open a channel for the given session, replacing any current one.
    ///
    /// A failed open does not surface an error here: the failure is
    /// reported through the status sink and a reconnect is scheduled, the
    /// same as for an unclean close.
    pub async fn connect(&self, session_id: impl Into<String>) {
        self.inner.clone().establish(session_id.into(), true).await;
    }

    /// Close the channel and clear the session. Pending reconnect timers
    /// become no-ops. Idempotent.
    pub fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let had_link = {
            let mut st = self.inner.state.write();
            let had = st.outbound.take().is_some();
            st.session_id = None;
            st.attempts = 0;
            had
        };

        if had_link {
            info!("channel disconnected");
            self.inner.notify_status(false, None);
        }
    }

    /// Whether a channel is currently open
    pub fn is_connected(&self) -> bool {
        self.inner
            .state
            .read()
            .outbound
            .as_ref()
            .map_or(false, |tx| !tx.is_closed())
    }

    /// The current session identifier, if any
    pub fn session_id(&self) -> Option<String> {
        self.inner.state.read().session_id.clone()
    }

    /// Reconnection attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.read().attempts
    }

    /// Send a message over the channel.
    ///
    /// Best-effort, at-most-once: while the channel is not open the
    /// message is dropped with a warning, never queued or retried.
    pub fn send_message(&self, kind: &str, content: serde_json::Value) {
        let envelope = Envelope::new(kind, content);

        let outbound = self.inner.state.read().outbound.clone();
        let Some(outbound) = outbound else {
            warn!(kind, "not connected; message dropped");
            return;
        };

        match envelope.to_json() {
            Ok(frame) => {
                if outbound.send(frame).is_err() {
                    warn!(kind, "channel closing; message dropped");
                }
            }
            Err(e) => warn!(kind, error = %e, "failed to serialize message; dropped"),
        }
    }

    /// Register a handler for a message kind
    pub fn add_message_handler(&self, kind: &str, handler: MessageHandler) {
        self.inner.registry.add(kind, handler);
    }

    /// Remove a previously registered handler (matched by identity).
    /// A no-op for unknown kinds or handlers.
    pub fn remove_message_handler(&self, kind: &str, handler: &MessageHandler) {
        self.inner.registry.remove(kind, handler);
    }

    /// Register a closure for a message kind; the returned handle is what
    /// `remove_message_handler` matches on.
    pub fn on_message<F>(&self, kind: &str, f: F) -> MessageHandler
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let handler: MessageHandler = Arc::new(f);
        self.add_message_handler(kind, handler.clone());
        handler
    }
}

// ─────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────

impl Inner {
    /// Derive the channel endpoint for a session
    fn endpoint_for(&self, session_id: &str) -> Result<Url> {
        let raw = format!(
            "{}{}/{}",
            self.settings.server_url.trim_end_matches('/'),
            self.settings.path_prefix,
            session_id
        );
        Url::parse(&raw).map_err(|e| Error::invalid_endpoint(raw, e.to_string()))
    }

    fn notify_status(&self, connected: bool, reason: Option<&str>) {
        let sink = self.sink.read().clone();
        sink.connection_status_changed(connected, reason);
    }

    /// Open a channel for the session, superseding any current connection
    /// and pending retries. A manual connect starts a fresh retry budget;
    /// retries keep counting against the current one.
    async fn establish(self: Arc<Self>, session_id: String, manual: bool) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut st = self.state.write();
            st.session_id = Some(session_id.clone());
            if manual {
                st.attempts = 0;
            }
            // dropping the old sender closes the replaced channel
            if st.outbound.take().is_some() {
                debug!("replacing existing channel");
            }
        }

        let endpoint = match self.endpoint_for(&session_id) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "failed to derive channel endpoint");
                self.notify_status(false, Some(&format!("connection failed: {}", e)));
                self.schedule_reconnect(epoch);
                return;
            }
        };

        info!(endpoint = %endpoint, "opening channel");

        let opened = match tokio::time::timeout(
            self.settings.connect_timeout,
            self.transport.open(&endpoint),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::connection_timeout(
                endpoint.as_str(),
                self.settings.connect_timeout.as_secs(),
            )),
        };

        match opened {
            Ok(channel) => {
                {
                    let mut st = self.state.write();
                    if self.epoch.load(Ordering::SeqCst) != epoch {
                        // superseded while opening; discard the fresh channel
                        return;
                    }
                    st.outbound = Some(channel.outbound);
                    st.attempts = 0;
                }
                info!("channel open");
                self.notify_status(true, None);

                let inner = self.clone();
                tokio::spawn(async move {
                    inner.run_link(channel.events, epoch).await;
                });
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "failed to open channel");
                self.notify_status(false, Some(&format!("connection failed: {}", e)));
                self.schedule_reconnect(epoch);
            }
        }
    }

    /// Consume a channel's event stream until it closes
    async fn run_link(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<ChannelEvent>,
        epoch: u64,
    ) {
        while let Some(event) = events.recv().await {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                // superseded by a newer connect or a disconnect;
                // this channel's fate is no longer ours to report
                return;
            }

            match event {
                ChannelEvent::Frame(text) => match Envelope::from_json(&text) {
                    Ok(envelope) => {
                        let invoked = self.registry.dispatch(&envelope);
                        debug!(kind = %envelope.kind, handlers = invoked, "dispatched message");
                    }
                    Err(e) => warn!(error = %e, "discarding undecodable frame"),
                },

                ChannelEvent::Error(message) => {
                    // error and close are independent notifications; the
                    // close event drives the state transition
                    warn!(error = %message, "channel error");
                    self.notify_status(false, None);
                }

                ChannelEvent::Closed(kind) => {
                    let reconnect = {
                        let mut st = self.state.write();
                        st.outbound = None;
                        kind == CloseKind::Unclean && st.session_id.is_some()
                    };

                    info!(clean = (kind == CloseKind::Clean), "channel closed");
                    self.notify_status(false, None);

                    if reconnect {
                        self.schedule_reconnect(epoch);
                    }
                    return;
                }
            }
        }
    }

    /// Schedule the next reconnect attempt, or report exhaustion
    fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
        let attempt = {
            let mut st = self.state.write();
            if st.session_id.is_none() {
                // deliberate disconnect; nothing to resume
                return;
            }
            if self.settings.retry.exhausted(st.attempts) {
                None
            } else {
                st.attempts += 1;
                Some(st.attempts)
            }
        };

        let Some(attempt) = attempt else {
            warn!(
                max = self.settings.retry.max_attempts,
                "max reconnection attempts reached"
            );
            self.notify_status(false, Some("max reconnection attempts reached"));
            return;
        };

        let delay = self.settings.retry.delay_for(attempt);
        info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        let inner = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if inner.epoch.load(Ordering::SeqCst) != epoch {
                debug!("reconnect timer superseded; dropping retry");
                return;
            }

            // the session may have been cleared by a disconnect since
            let session = inner.state.read().session_id.clone();
            if let Some(session) = session {
                inner.establish(session, false).await;
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
