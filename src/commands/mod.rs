//! Vehicle command operations
//!
//! Four operations, each run over its own link session:
//!
//! - **change_mode**: COMMAND_LONG `MAV_CMD_DO_SET_MODE`, correlated COMMAND_ACK
//! - **set_arm**: COMMAND_LONG `MAV_CMD_COMPONENT_ARM_DISARM`, COMMAND_ACK
//! - **fly_to_point**: single guided MISSION_ITEM, MISSION_ACK
//! - **upload_mission**: clear / count / item-by-item / final ack handshake
//!
//! # Result Contract
//!
//! Every operation returns `Ok(AckMessage)` or `Err(CommandError)` and never
//! panics or leaks a lower-level error: link failures are converted to a
//! `CommandError` carrying the vehicle address at the operation boundary.
//! The session is dropped (socket closed) on every exit path.

mod arm;
mod mission;
mod mode;
mod navigation;

use std::sync::Arc;

pub use arm::arm_disarm_command;
pub use mission::{MissionItem, MissionItems, WAYPOINT_ACCEPT_RADIUS, WAYPOINT_CLEAR_ALL_LABEL};
pub use mode::{set_mode_command, SET_MODE_LABEL};
pub use navigation::fly_to_command;

use crate::communication::mavlink::{AckMessage, BroadcastSink, LinkSession, NullSink};
use crate::config::{timeout_secs, LinkConfig};
use crate::error::{CommandError, ErrorKind, LinkError};
use crate::types::{VehicleAddress, Waypoint};

/// Outcome of one command operation.
pub type OperationResult = Result<AckMessage, CommandError>;

/// JSON rendering of either outcome (ack fields, or `ERROR` + `droneid`).
pub fn result_to_json(result: &OperationResult) -> serde_json::Value {
    match result {
        Ok(ack) => ack.to_json(),
        Err(err) => err.to_json(),
    }
}

/// Internal failure before the operation boundary.
pub(crate) enum Failure {
    /// Already in its final, user-facing form.
    Report(CommandError),
    /// Cause text the operation wraps in its own failure message.
    Fault { kind: ErrorKind, cause: String },
}

impl Failure {
    pub(crate) fn fault(kind: ErrorKind, cause: impl Into<String>) -> Self {
        Self::Fault {
            kind,
            cause: cause.into(),
        }
    }

    fn into_error(
        self,
        address: VehicleAddress,
        message: impl FnOnce(&str) -> String,
    ) -> CommandError {
        match self {
            Failure::Report(err) => err,
            Failure::Fault { kind, cause } => CommandError::new(kind, message(&cause), address),
        }
    }
}

impl From<LinkError> for Failure {
    fn from(err: LinkError) -> Self {
        Failure::fault(ErrorKind::ProtocolFault, err.to_string())
    }
}

/// Issues commands to vehicles.
///
/// Holds only configuration and the broadcast sink; no session outlives a
/// call, so concurrent calls (even to the same vehicle) do not interfere.
#[derive(Clone)]
pub struct CommandClient {
    config: LinkConfig,
    sink: Arc<dyn BroadcastSink>,
}

impl Default for CommandClient {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl CommandClient {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
        }
    }

    /// Client configured from `FLIGHT_LINK_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(LinkConfig::from_env())
    }

    /// Publish intermediate mission-upload acks to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn BroadcastSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Connect and require a heartbeat.
    fn open_session(&self, address: VehicleAddress) -> Result<LinkSession, Failure> {
        LinkSession::connect(address, &self.config).map_err(|err| match err {
            LinkError::NoHeartbeat { timeout_s, .. } => {
                crate::log_warn!("No heartbeat from {}", address);
                Failure::Report(CommandError::no_heartbeat(address, timeout_s))
            }
            other => other.into(),
        })
    }

    fn ack_timeout(&self, address: VehicleAddress) -> Failure {
        crate::log_warn!("No ack from {} within {:?}", address, self.config.ack_timeout);
        Failure::Report(CommandError::ack_timeout(
            address,
            timeout_secs(self.config.ack_timeout),
        ))
    }
}

/// `CommandClient::change_mode` with environment configuration.
pub fn change_mode(address: impl Into<VehicleAddress>, mode: &str) -> OperationResult {
    CommandClient::from_env().change_mode(address, mode)
}

/// `CommandClient::set_arm` with environment configuration.
pub fn set_arm(address: impl Into<VehicleAddress>, disarm: bool) -> OperationResult {
    CommandClient::from_env().set_arm(address, disarm)
}

/// `CommandClient::fly_to_point` with environment configuration.
pub fn fly_to_point(
    address: impl Into<VehicleAddress>,
    lat: f64,
    lon: f64,
    alt: f32,
) -> OperationResult {
    CommandClient::from_env().fly_to_point(address, lat, lon, alt)
}

/// `CommandClient::upload_mission` with environment configuration.
pub fn upload_mission(
    address: impl Into<VehicleAddress>,
    waypoints: &[Waypoint],
) -> OperationResult {
    CommandClient::from_env().upload_mission(address, waypoints)
}
