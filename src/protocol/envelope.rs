//! Message envelope
//!
//! The wire unit exchanged over the channel: a type discriminator, an
//! arbitrary JSON payload, and a producer-stamped timestamp. Inbound
//! envelopes are untrusted; decoding requires the `type` field, while
//! `content` and `timestamp` are tolerated missing.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Well-known message kinds.
///
/// The set is open: servers may introduce new kinds at any time, and
/// envelopes of unregistered kinds are silently ignored by dispatch.
pub mod kind {
    /// Chat text exchanged within the session
    pub const CHAT: &str = "chat";

    /// Base64-encoded audio chunk for a downstream decoder
    pub const AUDIO: &str = "audio";

    /// Server-reported error
    pub const ERROR: &str = "error";
}

/// Wrapper for all channel messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind discriminator
    #[serde(rename = "type")]
    pub kind: String,

    /// Kind-dependent payload
    #[serde(default)]
    pub content: serde_json::Value,

    /// Producer-stamped send time; may be absent on inbound frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Envelope {
    /// Create a new envelope stamped with the current time
    pub fn new(kind: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            content,
            timestamp: Some(Utc::now()),
        }
    }

    /// Serialize to a JSON frame
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::protocol_malformed(e.to_string()))
    }

    /// Deserialize from a JSON frame
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::protocol_malformed(e.to_string()))
    }

    /// Deserialize from JSON bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::protocol_malformed(e.to_string()))
    }

    /// Decode the payload into a typed content struct
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.content.clone())
            .map_err(|e| Error::payload_invalid(self.kind.clone(), e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_wire_format() {
        let envelope = Envelope::new(kind::CHAT, json!({"text": "hello"}));
        let frame = envelope.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        let obj = value.as_object().unwrap();

        // Exactly the three wire keys
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["type"], "chat");
        assert_eq!(obj["content"]["text"], "hello");
        assert!(obj["timestamp"].is_string());
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let envelope = Envelope::new("ping", json!({"n": 1}));
        let frame = envelope.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        let stamp = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_roundtrip() {
        let envelope = Envelope::new(kind::CHAT, json!({"text": "hi", "from": "server"}));
        let frame = envelope.to_json().unwrap();
        let parsed = Envelope::from_json(&frame).unwrap();

        assert_eq!(parsed.kind, "chat");
        assert_eq!(parsed.content["text"], "hi");
        assert_eq!(parsed.timestamp, envelope.timestamp);
    }

    #[test]
    fn test_inbound_requires_type() {
        let result = Envelope::from_json(r#"{"content": {"text": "hi"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_inbound_tolerates_missing_content_and_timestamp() {
        let envelope = Envelope::from_json(r#"{"type": "ping"}"#).unwrap();
        assert_eq!(envelope.kind, "ping");
        assert!(envelope.content.is_null());
        assert!(envelope.timestamp.is_none());
    }

    #[test]
    fn test_inbound_rejects_invalid_json() {
        assert!(Envelope::from_json("not json").is_err());
        assert!(Envelope::from_json(r#"["type", "chat"]"#).is_err());
    }

    #[test]
    fn test_from_json_bytes() {
        let envelope = Envelope::from_json_bytes(br#"{"type": "chat", "content": 42}"#).unwrap();
        assert_eq!(envelope.kind, "chat");
        assert_eq!(envelope.content, json!(42));
    }

    #[test]
    fn test_content_as_mismatch() {
        #[derive(Deserialize)]
        struct Numbered {
            #[allow(dead_code)]
            n: u32,
        }

        let envelope = Envelope::new("ping", json!({"text": "not a number"}));
        assert!(envelope.content_as::<Numbered>().is_err());
    }
}
