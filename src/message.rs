//! Outbound message types.
//!
//! An [`OutboundMessage`] is what the relay hands to the broker once a
//! webhook has been authenticated. The payload is the verified request body,
//! untouched.

use bytes::Bytes;
use std::collections::BTreeMap;

/// Single-valued header mapping published alongside the payload.
///
/// Keys are canonical MIME header names (e.g. `User-Agent`, `X-Gitcode-Event`).
pub type MessageHeaders = BTreeMap<String, String>;

/// A message ready to be published to the broker.
///
/// # Fields
///
/// - `topic`: Broker topic (Redis stream key) to publish to
/// - `headers`: Collapsed request headers, with the relay's User-Agent
/// - `payload`: Raw request body exactly as it was verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Target topic
    pub topic: String,

    /// Collapsed request headers
    pub headers: MessageHeaders,

    /// Verified body bytes
    pub payload: Bytes,
}

impl OutboundMessage {
    /// Create a new message
    pub fn new(topic: impl Into<String>, headers: MessageHeaders, payload: Bytes) -> Self {
        Self {
            topic: topic.into(),
            headers,
            payload,
        }
    }

    /// Look up a header value by its canonical name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }
}

/// Webhook metadata carried as logging context for a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    /// Platform event type (e.g. "Note Hook", "Push Hook")
    pub event_type: String,

    /// Platform delivery id, unique per webhook attempt
    pub delivery_id: String,
}

impl EventMeta {
    pub fn new(event_type: impl Into<String>, delivery_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            delivery_id: delivery_id.into(),
        }
    }
}
