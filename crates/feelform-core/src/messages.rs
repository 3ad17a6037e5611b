//! Relay wire messages.
//!
//! Frames are small JSON objects discriminated by `type`. Inbound frames are
//! decoded leniently: anything without a usable `type` and non-empty `room`
//! decodes to `None` and is dropped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::RoomId;
use crate::value::number_or_zero;

/// Status text sent to the other members of a room when someone joins.
pub const STATUS_JOINED: &str = "joined";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Join {
        room: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },
    Hello {
        room: RoomId,
    },
    Tilt {
        room: RoomId,
        x: f64,
        y: f64,
    },
    /// Server to client only.
    Status {
        room: RoomId,
        message: String,
    },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Hello { .. } => "hello",
            Self::Tilt { .. } => "tilt",
            Self::Status { .. } => "status",
        }
    }

    pub fn joined(room: RoomId) -> Self {
        Self::Status {
            room,
            message: STATUS_JOINED.to_owned(),
        }
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Decode a client-to-server frame. `status` frames are not accepted inbound.
pub fn parse_message(raw: &str) -> Option<Message> {
    decode(raw).filter(|msg| !matches!(msg, Message::Status { .. }))
}

/// Decode a server-to-client frame.
pub fn parse_server_message(raw: &str) -> Option<Message> {
    decode(raw)
}

fn decode(raw: &str) -> Option<Message> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let obj = value.as_object()?;
    let room = obj
        .get("room")
        .and_then(Value::as_str)
        .and_then(RoomId::parse)?;

    match obj.get("type").and_then(Value::as_str)? {
        "join" => Some(Message::Join {
            room,
            role: obj.get("role").and_then(Value::as_str).map(str::to_owned),
        }),
        "hello" => Some(Message::Hello { room }),
        "tilt" => Some(Message::Tilt {
            room,
            x: number_or_zero(axis(obj, "x", "tiltX")),
            y: number_or_zero(axis(obj, "y", "tiltY")),
        }),
        "status" => Some(Message::Status {
            room,
            message: obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        }),
        _ => None,
    }
}

/// The primary key wins whenever it is present and non-null, even if it is
/// not numeric; the alias is only consulted when the key is absent.
fn axis<'a>(obj: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| obj.get(alias))
}
