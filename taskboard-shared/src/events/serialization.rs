/// Relay message serialization
///
/// When several API processes share a Redis channel, each published event
/// travels as one JSON string carrying the target room and the envelope:
///
/// ```text
/// {"room":"project:<id>","message":{"event":"taskUpdated","data":{...}}}
/// ```
///
/// Every process decodes the message and delivers it to its own sockets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{LiveEvent, Room};

/// Redis pub/sub channel shared by all API processes
pub const RELAY_CHANNEL: &str = "taskboard:live";

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// One event addressed to one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessage {
    pub room: Room,
    pub message: LiveEvent,
}

/// Encodes an event for the relay channel
pub fn encode_relay(room: Room, event: &LiveEvent) -> Result<String, SerializationError> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        room: Room,
        message: &'a LiveEvent,
    }

    Ok(serde_json::to_string(&Borrowed {
        room,
        message: event,
    })?)
}

/// Decodes a relay payload
pub fn decode_relay(payload: &str) -> Result<RelayMessage, SerializationError> {
    Ok(serde_json::from_str(payload)?)
}
