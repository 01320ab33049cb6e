//! Inbound event model.
//!
//! An [`Event`] is one occurrence delivered by a transport listener: the
//! device's credential token, the event kind, and the raw payload exactly as
//! it arrived on the wire. Payload decoding is deferred to the dispatcher so
//! that a malformed body can be dropped with a log line rather than failing
//! at the transport boundary.

use crate::errors::DispatchError;
use crate::shadow::PointClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of an inbound device event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connect,
    Disconnect,
    Telemetry,
    Attributes,
    Raw,
    RpcRequest,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Telemetry => "telemetry",
            EventKind::Attributes => "attributes",
            EventKind::Raw => "raw",
            EventKind::RpcRequest => "rpc_request",
        }
    }

    /// Kinds that carry a decodable field payload.
    pub fn is_state_bearing(&self) -> bool {
        matches!(
            self,
            EventKind::Telemetry | EventKind::Attributes | EventKind::Raw | EventKind::RpcRequest
        )
    }

    /// The shadow point class this kind feeds, if any. RPC requests pass
    /// through the rule chain without touching the shadow.
    pub fn point_class(&self) -> Option<PointClass> {
        match self {
            EventKind::Telemetry | EventKind::Raw => Some(PointClass::Telemetry),
            EventKind::Attributes => Some(PointClass::Attributes),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound occurrence, consumed exactly once by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Credential presented by the device, resolved to an identity context.
    pub token: String,
    pub kind: EventKind,
    /// Raw payload bytes as UTF-8 JSON; may be empty for connect/disconnect.
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(token: impl Into<String>, kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind,
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Decode the payload into a field mapping.
    pub fn decode_payload(&self) -> Result<Map<String, Value>, DispatchError> {
        serde_json::from_str::<Map<String, Value>>(&self.payload).map_err(|source| {
            DispatchError::DecodeFailed {
                kind: self.kind.as_str().to_string(),
                source,
            }
        })
    }
}
