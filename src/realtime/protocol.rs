use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages a client may send over the tracking socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Subscribe { shipment_id: Uuid },
    Unsubscribe { shipment_id: Uuid },
}

/// Messages the server pushes to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        client_id: Uuid,
        message: String,
    },
    Pong,
    Subscribed {
        shipment_id: Uuid,
        tracking_number: String,
    },
    Unsubscribed {
        shipment_id: Uuid,
    },
    Error {
        message: String,
    },
    LocationUpdate {
        shipment_id: Uuid,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
        speed: Option<f64>,
        heading: Option<f64>,
        tracking_number: String,
    },
    StatusUpdate {
        shipment_id: Uuid,
        old_status: String,
        new_status: String,
        tracking_number: String,
        timestamp: DateTime<Utc>,
    },
}

/// A client message that could not be understood. The connection stays
/// open; the error is reported back over the same socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not JSON, or a known type with a bad payload.
    Malformed(String),
    /// Well-formed JSON with a `type` we do not recognize.
    UnknownType(String),
}

impl ProtocolError {
    pub fn into_reply(self) -> ServerMessage {
        match self {
            Self::Malformed(detail) => ServerMessage::Error {
                message: format!("Invalid message: {}", detail),
            },
            Self::UnknownType(kind) => ServerMessage::Error {
                message: format!("Unknown message type: {}", kind),
            },
        }
    }
}

const KNOWN_TYPES: &[&str] = &["ping", "subscribe", "unsubscribe"];

/// Parses one inbound frame, distinguishing an unrecognized `type` from a
/// recognized one with a malformed payload.
pub fn parse_client_message(raw: &str) -> Result<ClientMessage, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ProtocolError::Malformed(format!("invalid JSON: {}", e)))?;

    let message_type = value
        .get("type")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::Malformed("missing message type".to_string()))?;

    if !KNOWN_TYPES.contains(&message_type.as_str()) {
        return Err(ProtocolError::UnknownType(message_type));
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
