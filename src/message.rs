//! Inbound message envelope

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, REFRESH_SENTINEL};
use serde::{Deserialize, Serialize};

/// Envelope delivered by the message bus
///
/// ```json
/// {"stream_id": "s1", "stream_alt_id": "wk", "message_type": "signup", "payload": {}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_alt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default)]
    pub payload: JsonObject,
}

impl IncomingMessage {
    /// Envelope for a stream with the given payload
    pub fn new(stream_id: impl Into<String>, payload: JsonObject) -> Self {
        Self {
            stream_id: Some(stream_id.into()),
            payload,
            ..Self::default()
        }
    }

    /// Set the envelope message type
    #[must_use]
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Set the alternate stream id
    #[must_use]
    pub fn with_alt_id(mut self, stream_alt_id: impl Into<String>) -> Self {
        self.stream_alt_id = Some(stream_alt_id.into());
        self
    }

    /// The control message that asks the pipeline to reload its config
    pub fn refresh_sentinel() -> Self {
        Self {
            stream_id: Some(String::new()),
            message_type: Some(REFRESH_SENTINEL.to_string()),
            ..Self::default()
        }
    }

    /// Whether this is the refresh control message
    pub fn is_refresh(&self) -> bool {
        self.message_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(REFRESH_SENTINEL))
    }

    /// Decode an envelope from the bus
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::malformed(format!("Invalid message envelope: {e}")))
    }

    /// Wrap a raw event posted to the ingress
    ///
    /// `writeKey` becomes `stream_alt_id` (and `stream_id` is then ignored),
    /// a string `type` becomes `message_type`, and the whole event is kept
    /// as the payload.
    pub fn from_event(event: JsonValue) -> Result<Self> {
        let JsonValue::Object(payload) = event else {
            return Err(Error::malformed("Event must be a JSON object"));
        };

        let text = |key: &str| payload.get(key).and_then(JsonValue::as_str).map(str::to_string);

        let (stream_id, stream_alt_id) = match text("writeKey") {
            Some(write_key) => (None, Some(write_key)),
            None => (text("stream_id"), None),
        };
        if stream_id.is_none() && stream_alt_id.is_none() {
            return Err(Error::malformed("Event has neither writeKey nor stream_id"));
        }
        let message_type = text("type");

        Ok(Self {
            stream_id,
            stream_alt_id,
            message_type,
            payload,
        })
    }

    /// The payload's own `type` field, if it is a string
    pub fn payload_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(JsonValue::as_str)
    }

    /// Payload serialized as JSON bytes
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload)?)
    }
}
