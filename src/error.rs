use core::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::VehicleAddress;

/// Errors raised while talking to a vehicle over a link session.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No heartbeat from {address} (timeout {timeout_s}s)")]
    NoHeartbeat {
        address: VehicleAddress,
        timeout_s: u64,
    },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure category reported at the operation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Vehicle never announced itself within the heartbeat timeout.
    NoHeartbeat,
    /// Requested mode is not in the vehicle's mode table.
    InvalidMode,
    /// Request sent, no matching response before the ack timeout.
    AckTimeout,
    /// Anything else that went wrong on the link.
    ProtocolFault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoHeartbeat => "no heartbeat",
            ErrorKind::InvalidMode => "invalid mode",
            ErrorKind::AckTimeout => "ack timeout",
            ErrorKind::ProtocolFault => "protocol fault",
        };
        f.write_str(name)
    }
}

/// Structured failure of a command operation.
///
/// Serializes to `{"ERROR": message, "droneid": address}` so callers can
/// render it next to a successful ack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
    pub droneid: VehicleAddress,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, droneid: VehicleAddress) -> Self {
        Self {
            kind,
            message: message.into(),
            droneid,
        }
    }

    pub fn no_heartbeat(droneid: VehicleAddress, timeout_s: u64) -> Self {
        let err = LinkError::NoHeartbeat {
            address: droneid,
            timeout_s,
        };
        Self::new(ErrorKind::NoHeartbeat, err.to_string(), droneid)
    }

    pub fn ack_timeout(droneid: VehicleAddress, timeout_s: u64) -> Self {
        Self::new(
            ErrorKind::AckTimeout,
            format!("No ack_msg received (timeout {timeout_s}s)."),
            droneid,
        )
    }

    /// Render as the JSON error shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ERROR": self.message,
            "droneid": self.droneid.value(),
        })
    }
}

impl Serialize for CommandError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("ERROR", &self.message)?;
        map.serialize_entry("droneid", &self.droneid.value())?;
        map.end()
    }
}
