//! sessionlink - resilient session channel client
//!
//! Maintains a persistent WebSocket channel to a server endpoint keyed by a
//! session identifier, recovers from unexpected disconnects with exponential
//! backoff, and dispatches typed inbound messages to registered handlers.
//!
//! ```no_run
//! use sessionlink::{ChannelSettings, ConnectionManager};
//! use serde_json::json;
//!
//! # async fn run() {
//! let manager = ConnectionManager::new(ChannelSettings::default());
//!
//! manager.on_message("chat", |envelope| {
//!     println!("chat: {}", envelope.content);
//! });
//!
//! manager.connect("abc123").await;
//! manager.send_message("chat", json!({"text": "hello"}));
//! # }
//! ```

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod version;

pub use channel::{
    ChannelSettings, ConnectionManager, HandlerRegistry, LogStatusSink, MessageHandler,
    RetryPolicy, StatusSink, Transport, WsTransport,
};
pub use config::ClientConfig;
pub use error::{Error, ErrorCode, Result};
pub use protocol::Envelope;
