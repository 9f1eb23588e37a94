//! Admin gateway opcodes and wire-format messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broadcast::types::BroadcastStatus;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_HEARTBEAT_ACK: u8 = 6;

// ---------------------------------------------------------------------------
// Server → Observer message
// ---------------------------------------------------------------------------

/// A message sent from the server to an observer over WebSocket.
#[derive(Debug, Clone, Serialize)]
pub struct AdminMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    pub d: Value,
}

impl AdminMessage {
    /// Build a DISPATCH message (op=0).
    pub fn dispatch(event_name: &str, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event_name.to_string()),
            d: data,
        }
    }

    /// First message on a new observer connection.
    pub fn hello(observer_id: &str) -> Self {
        Self::dispatch(EventName::HELLO, serde_json::json!({ "observer_id": observer_id }))
    }

    pub fn status(status: &BroadcastStatus) -> Result<Self, serde_json::Error> {
        Ok(Self::dispatch(EventName::BROADCAST_STATUS, serde_json::to_value(status)?))
    }

    /// Build a HEARTBEAT_ACK message (op=6).
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OP_HEARTBEAT_ACK,
            t: None,
            d: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Observer → Server message
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ObserverMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

// ---------------------------------------------------------------------------
// Dispatch event types
// ---------------------------------------------------------------------------

pub struct EventName;

impl EventName {
    pub const HELLO: &'static str = "HELLO";
    pub const BROADCAST_STATUS: &'static str = "BROADCAST_STATUS";
}
