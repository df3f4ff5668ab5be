//! Chat event types for the Leaseline real-time channel.
//!
//! Events travel as JSON text frames over WebSocket, externally tagged as
//! `{"event": <name>, "data": <payload>}`. The `message` payload of a direct
//! message is an opaque [`serde_json::Value`] — the presence service forwards
//! it verbatim and never inspects its structure. Payload validation belongs
//! to the application layer on either end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error type for event encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The frame is not valid JSON for any known event.
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Events sent by a client to the presence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Announce which logical user this connection answers for.
    ///
    /// The user id is issued by the platform's auth layer; the presence
    /// service performs no format validation on it.
    AddUser(String),

    /// Send a direct message to another user.
    SendMsg(DirectMessage),
}

/// Events sent by the presence service to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Registration acknowledgment, echoing the user id back.
    UserAdded(String),

    /// A message relayed from another connection. The data is the sender's
    /// original `message` value, unchanged.
    ReceiveMsg(Value),
}

/// A directed message: routing metadata plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// User id of the recipient (used for routing only).
    pub to: String,
    /// Opaque application payload, forwarded verbatim.
    pub message: Value,
}

/// Encodes a [`ClientEvent`] into a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the event cannot be serialized.
pub fn encode_client(event: &ClientEvent) -> Result<String, EventError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes a [`ClientEvent`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the frame is not a known client
/// event (bad JSON, unknown event name, or missing fields).
pub fn decode_client(text: &str) -> Result<ClientEvent, EventError> {
    Ok(serde_json::from_str(text)?)
}

/// Encodes a [`ServerEvent`] into a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the event cannot be serialized.
pub fn encode_server(event: &ServerEvent) -> Result<String, EventError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes a [`ServerEvent`] from a JSON text frame.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the frame is not a known server
/// event.
pub fn decode_server(text: &str) -> Result<ServerEvent, EventError> {
    Ok(serde_json::from_str(text)?)
}
