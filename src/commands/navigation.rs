//! Single-point "fly here" navigation
//!
//! Sent as one MISSION_ITEM outside any upload handshake. `current = 2` marks
//! it as a guided-mode go-to rather than a mission slot, and `seq` stays 0,
//! the only slot a vehicle accepts for a lone item.

use mavlink::common::{MavCmd, MavFrame, MavMessage, MavMissionType, MISSION_ITEM_DATA};

use super::{CommandClient, Failure, OperationResult};
use crate::communication::mavlink::{await_ack, AckMessage, AckRequest, MessageKind};
use crate::types::VehicleAddress;

/// `current` value of a guided go-to item
pub const GUIDED_GOTO_MARKER: u8 = 2;

/// MISSION_ITEM directing the vehicle to `(lat, lon, alt)` now.
pub fn fly_to_command(
    target_system: u8,
    target_component: u8,
    lat: f64,
    lon: f64,
    alt: f32,
) -> MavMessage {
    MavMessage::MISSION_ITEM(MISSION_ITEM_DATA {
        target_system,
        target_component,
        seq: 0,
        frame: MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT,
        command: MavCmd::MAV_CMD_NAV_WAYPOINT,
        current: GUIDED_GOTO_MARKER,
        autocontinue: 0,
        param1: 0.0,
        param2: 0.0,
        param3: 0.0,
        param4: 0.0,
        x: lat as f32,
        y: lon as f32,
        z: alt,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
    })
}

impl CommandClient {
    /// Send the vehicle at `address` straight to one point.
    pub fn fly_to_point(
        &self,
        address: impl Into<VehicleAddress>,
        lat: f64,
        lon: f64,
        alt: f32,
    ) -> OperationResult {
        let address = address.into();
        crate::log_info!("Flying {} to ({}, {}, {})", address, lat, lon, alt);

        self.run_fly_to_point(address, lat, lon, alt).map_err(|failure| {
            let err = failure.into_error(address, str::to_string);
            crate::log_warn!("Fly-to on {} failed: {}", address, err);
            err
        })
    }

    fn run_fly_to_point(
        &self,
        address: VehicleAddress,
        lat: f64,
        lon: f64,
        alt: f32,
    ) -> Result<AckMessage, Failure> {
        let mut session = self.open_session(address)?;

        let (target_system, target_component) = session.target();
        session.send(&fly_to_command(target_system, target_component, lat, lon, alt))?;

        let request = AckRequest::new(&[MessageKind::MissionAck]).timeout(self.config.ack_timeout);
        await_ack(&mut session, address, &request)?.ok_or_else(|| self.ack_timeout(address))
    }
}
