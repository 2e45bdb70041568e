//! Handler registry
//!
//! Maps message kinds to ordered lists of subscriber callbacks. Handlers
//! are invoked in registration order and removed by identity. Kinds with
//! no registered handlers are ignored: new message kinds may appear on the
//! wire without breaking older clients.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::protocol::Envelope;

/// A subscriber callback for one message kind.
///
/// Handlers are fire-and-forget; keep the returned `Arc` to remove the
/// handler later (removal matches by identity).
pub type MessageHandler = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Per-kind ordered handler lists
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<MessageHandler>>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for the given kind
    pub fn add(&self, kind: &str, handler: MessageHandler) {
        self.handlers
            .write()
            .entry(kind.to_string())
            .or_default()
            .push(handler);
    }

    /// Remove the first handler registered for `kind` that is the same
    /// instance as `handler`. Unknown kinds and unregistered handlers are
    /// a no-op.
    pub fn remove(&self, kind: &str, handler: &MessageHandler) {
        let mut map = self.handlers.write();
        if let Some(list) = map.get_mut(kind) {
            if let Some(index) = list.iter().position(|h| Arc::ptr_eq(h, handler)) {
                list.remove(index);
            }
            if list.is_empty() {
                map.remove(kind);
            }
        }
    }

    /// Number of handlers registered for a kind
    pub fn count(&self, kind: &str) -> usize {
        self.handlers.read().get(kind).map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the envelope's kind, in
    /// registration order. A panicking handler is caught and logged and
    /// does not stop dispatch to the remaining handlers. Returns the
    /// number of handlers invoked.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        // Snapshot under the read lock so handlers can mutate the registry
        let snapshot: Vec<MessageHandler> = self
            .handlers
            .read()
            .get(&envelope.kind)
            .cloned()
            .unwrap_or_default();

        for handler in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(envelope))).is_err() {
                warn!(kind = %envelope.kind, "message handler panicked; continuing dispatch");
            }
        }

        snapshot.len()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
