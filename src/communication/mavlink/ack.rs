//! Acknowledgment messages
//!
//! Vehicle responses are exposed as a field map (`serde_json::Map`) because
//! their field set depends on the message kind. The map mirrors the protocol
//! fields by name with numeric values, plus the decorations added by the
//! correlator:
//!
//! - `droneid`: address of the vehicle the message came from
//! - `result_description`: human-readable text for a numeric `result`
//! - `command`: a label overriding the numeric command id
//!
//! Typed accessors cover the fields the command operations depend on.

use core::fmt;

use mavlink::common::MavMessage;
use mavlink::Message;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::VehicleAddress;

/// Message kinds the correlator can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Heartbeat,
    CommandAck,
    MissionAck,
    /// Also known by its legacy name WAYPOINT_REQUEST.
    MissionRequest,
    MissionRequestInt,
}

impl MessageKind {
    /// Kinds accepted as "the vehicle responded" during a mission upload.
    pub const MISSION_RESPONSES: [MessageKind; 3] = [
        MessageKind::MissionRequest,
        MessageKind::MissionAck,
        MessageKind::MissionRequestInt,
    ];

    /// Kind of a decoded message, if it is one we consume.
    pub fn of(msg: &MavMessage) -> Option<Self> {
        match msg {
            MavMessage::HEARTBEAT(_) => Some(Self::Heartbeat),
            MavMessage::COMMAND_ACK(_) => Some(Self::CommandAck),
            MavMessage::MISSION_ACK(_) => Some(Self::MissionAck),
            MavMessage::MISSION_REQUEST(_) => Some(Self::MissionRequest),
            MavMessage::MISSION_REQUEST_INT(_) => Some(Self::MissionRequestInt),
            _ => None,
        }
    }

    /// Protocol message name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Heartbeat => "HEARTBEAT",
            Self::CommandAck => "COMMAND_ACK",
            Self::MissionAck => "MISSION_ACK",
            Self::MissionRequest => "MISSION_REQUEST",
            Self::MissionRequestInt => "MISSION_REQUEST_INT",
        }
    }

    /// Parse a protocol message name, including legacy aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HEARTBEAT" => Some(Self::Heartbeat),
            "COMMAND_ACK" => Some(Self::CommandAck),
            "MISSION_ACK" => Some(Self::MissionAck),
            "MISSION_REQUEST" | "WAYPOINT_REQUEST" => Some(Self::MissionRequest),
            "MISSION_REQUEST_INT" => Some(Self::MissionRequestInt),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MAV_RESULT code descriptions, indexed by code.
const MAV_RESULT_DESCRIPTIONS: [&str; 10] = [
    "Command is valid (is supported and has valid parameters), and was executed.",
    "Command is valid, but cannot be executed at this time. This is used to indicate a problem that should be fixed just by waiting (e.g. a state machine is busy, can't arm because have not got GPS lock, etc.). Retrying later should work.",
    "Command is invalid (is supported but has invalid parameters). Retrying same command and parameters will not work.",
    "Command is not supported (unknown).",
    "Command is valid, but execution has failed. This is used to indicate any non-temporary or unexpected problem, i.e. any problem that must be fixed before the command can succeed/be retried. For example, attempting to write a file when out of memory, attempting to arm when sensors are not calibrated, etc.",
    "Command is valid and is being executed. This will be followed by further progress updates, i.e. the component may send further COMMAND_ACK messages with result MAV_RESULT_IN_PROGRESS (at a rate decided by the implementation), and must terminate by sending a COMMAND_ACK message with final result of the operation. The COMMAND_ACK.progress field can be used to indicate the progress of the operation.",
    "Command has been cancelled (as a result of receiving a COMMAND_CANCEL message).",
    "Command is only accepted when sent as a COMMAND_LONG.",
    "Command is only accepted when sent as a COMMAND_INT.",
    "Command is invalid because a frame is required and the specified frame is not supported.",
];

/// Standard description of a MAV_RESULT code.
pub fn result_description(code: u64) -> Option<&'static str> {
    usize::try_from(code)
        .ok()
        .and_then(|index| MAV_RESULT_DESCRIPTIONS.get(index))
        .copied()
}

/// Decorated vehicle response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AckMessage {
    fields: Map<String, Value>,
}

impl AckMessage {
    /// Field map of a decoded message.
    pub fn from_message(msg: &MavMessage) -> Self {
        let mut fields = Map::new();
        fields.insert("mavpackettype".into(), Value::from(msg.message_name()));

        match msg {
            MavMessage::HEARTBEAT(data) => {
                fields.insert("type".into(), Value::from(data.mavtype as u32));
                fields.insert("autopilot".into(), Value::from(data.autopilot as u32));
                fields.insert("base_mode".into(), Value::from(data.base_mode.bits()));
                fields.insert("custom_mode".into(), Value::from(data.custom_mode));
                fields.insert(
                    "system_status".into(),
                    Value::from(data.system_status as u32),
                );
                fields.insert("mavlink_version".into(), Value::from(data.mavlink_version));
            }
            MavMessage::COMMAND_ACK(data) => {
                fields.insert("command".into(), Value::from(data.command as u32));
                fields.insert("result".into(), Value::from(data.result as u32));
                fields.insert("progress".into(), Value::from(data.progress));
                fields.insert("result_param2".into(), Value::from(data.result_param2));
                fields.insert("target_system".into(), Value::from(data.target_system));
                fields.insert(
                    "target_component".into(),
                    Value::from(data.target_component),
                );
            }
            MavMessage::MISSION_ACK(data) => {
                fields.insert("target_system".into(), Value::from(data.target_system));
                fields.insert(
                    "target_component".into(),
                    Value::from(data.target_component),
                );
                fields.insert("type".into(), Value::from(data.mavtype as u32));
                fields.insert("mission_type".into(), Value::from(data.mission_type as u32));
            }
            MavMessage::MISSION_REQUEST(data) => {
                fields.insert("target_system".into(), Value::from(data.target_system));
                fields.insert(
                    "target_component".into(),
                    Value::from(data.target_component),
                );
                fields.insert("seq".into(), Value::from(data.seq));
                fields.insert("mission_type".into(), Value::from(data.mission_type as u32));
            }
            MavMessage::MISSION_REQUEST_INT(data) => {
                fields.insert("target_system".into(), Value::from(data.target_system));
                fields.insert(
                    "target_component".into(),
                    Value::from(data.target_component),
                );
                fields.insert("seq".into(), Value::from(data.seq));
                fields.insert("mission_type".into(), Value::from(data.mission_type as u32));
            }
            _ => {}
        }

        Self { fields }
    }

    /// Attach `droneid`, `result_description` and an optional `command` label.
    pub fn decorate(&mut self, droneid: VehicleAddress, command_label: Option<&str>) {
        self.fields
            .insert("droneid".into(), Value::from(droneid.value()));
        if let Some(description) = self.result().and_then(result_description) {
            self.fields
                .insert("result_description".into(), Value::from(description));
        }
        if let Some(label) = command_label {
            self.fields.insert("command".into(), Value::from(label));
        }
    }

    /// Raw field access.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Message kind, from `mavpackettype`.
    pub fn kind(&self) -> Option<MessageKind> {
        self.get("mavpackettype")
            .and_then(Value::as_str)
            .and_then(MessageKind::from_name)
    }

    /// Requested mission item (MISSION_REQUEST / MISSION_REQUEST_INT).
    pub fn seq(&self) -> Option<u16> {
        self.get("seq")
            .and_then(Value::as_u64)
            .and_then(|seq| u16::try_from(seq).ok())
    }

    /// MAV_RESULT code (COMMAND_ACK).
    pub fn result(&self) -> Option<u64> {
        self.get("result").and_then(Value::as_u64)
    }

    /// MAV_MISSION_RESULT code (MISSION_ACK `type`).
    pub fn mission_result(&self) -> Option<u64> {
        match self.kind() {
            Some(MessageKind::MissionAck) => self.get("type").and_then(Value::as_u64),
            _ => None,
        }
    }

    /// Numeric command id, unless a label replaced it.
    pub fn command_id(&self) -> Option<u32> {
        self.get("command")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
    }

    /// Command label attached by the correlator.
    pub fn command_label(&self) -> Option<&str> {
        self.get("command").and_then(Value::as_str)
    }

    pub fn droneid(&self) -> Option<u16> {
        self.get("droneid")
            .and_then(Value::as_u64)
            .and_then(|id| u16::try_from(id).ok())
    }

    pub fn result_description(&self) -> Option<&str> {
        self.get("result_description").and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl fmt::Display for AckMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}
