//! Wire protocol for the session channel
//!
//! Defines the message envelope and the typed payloads for well-known
//! message kinds. Frames are JSON text in both directions.

mod envelope;
mod payloads;

pub use envelope::*;
pub use payloads::*;
