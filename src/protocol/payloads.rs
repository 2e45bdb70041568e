//! Typed payloads for well-known message kinds
//!
//! These mirror what the server actually puts in `content` for each kind.
//! Handlers that only need the raw JSON can skip these entirely.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Payload of a `chat` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatContent {
    /// Message text
    pub text: String,

    /// Sender role or name
    #[serde(default)]
    pub sender: Option<String>,
}

/// Payload of an `audio` envelope: one encoded audio chunk.
///
/// The `data` field is base64 so the chunk survives JSON text framing.
/// Decoding and playback belong to a downstream consumer; this type only
/// carries the bytes to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioContent {
    /// Base64-encoded audio bytes
    pub data: String,

    /// Container/codec hint (e.g. "mp3", "wav")
    #[serde(default)]
    pub format: Option<String>,
}

impl AudioContent {
    /// Decode the base64 payload into raw bytes
    pub fn decode_data(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.data)
            .map_err(|e| Error::payload_invalid(crate::protocol::kind::AUDIO, e.to_string()))
    }

    /// Build a payload from raw bytes
    pub fn from_bytes(bytes: &[u8], format: Option<String>) -> Self {
        Self {
            data: BASE64.encode(bytes),
            format,
        }
    }
}

/// Payload of an `error` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContent {
    /// Human-readable message
    pub message: String,

    /// Machine-readable code
    #[serde(default)]
    pub code: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
