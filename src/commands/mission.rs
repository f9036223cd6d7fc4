//! Mission upload
//!
//! Pushes a route to the vehicle with the MAVLink mission protocol. The
//! vehicle drives the transfer: after the count is announced it requests
//! items by sequence number, in whatever order it likes, and the sender only
//! answers those requests.
//!
//! # Upload Flow (GCS → Autopilot)
//!
//! 1. Setup: bind, wait for a heartbeat (a missing one is tolerated), build
//!    the item list with a home item (0, 0, 0) in slot 0
//! 2. Clear: send MISSION_CLEAR_ALL, await a response (published as
//!    `WAYPOINT_CLEAR_ALL`)
//! 3. Count: send MISSION_COUNT
//! 4. Transfer: `count` times, await a request (published) and send the item
//!    named by its `seq`
//! 5. Finalize: await the terminal MISSION_ACK and return it (not published)
//!
//! Every response wait accepts MISSION_REQUEST, MISSION_REQUEST_INT and
//! MISSION_ACK. A missing response during transfer or finalize, a request
//! for an item that does not exist, or an early MISSION_ACK fails the upload.

use mavlink::common::{
    MavCmd, MavFrame, MavMessage, MavMissionType, MISSION_CLEAR_ALL_DATA, MISSION_COUNT_DATA,
    MISSION_ITEM_DATA, MISSION_ITEM_INT_DATA,
};

use super::{CommandClient, Failure, OperationResult};
use crate::communication::mavlink::{await_ack, AckMessage, AckRequest, LinkSession, MessageKind};
use crate::config::timeout_secs;
use crate::error::ErrorKind;
use crate::types::{VehicleAddress, Waypoint};

/// Acceptance radius of uploaded waypoints (meters)
pub const WAYPOINT_ACCEPT_RADIUS: f32 = 1.0;

/// `command` label attached to the clear-phase response
pub const WAYPOINT_CLEAR_ALL_LABEL: &str = "WAYPOINT_CLEAR_ALL";

/// One navigation item of an upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionItem {
    pub target_system: u8,
    pub target_component: u8,
    pub seq: u16,
    pub waypoint: Waypoint,
}

impl MissionItem {
    /// Float-coordinate form, answering MISSION_REQUEST.
    pub fn to_mission_item(&self) -> MavMessage {
        MavMessage::MISSION_ITEM(MISSION_ITEM_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            seq: self.seq,
            frame: MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT,
            command: MavCmd::MAV_CMD_NAV_WAYPOINT,
            current: 0,
            autocontinue: 0,
            param1: 0.0,
            param2: WAYPOINT_ACCEPT_RADIUS,
            param3: 0.0,
            param4: 0.0,
            x: self.waypoint.lat as f32,
            y: self.waypoint.lon as f32,
            z: self.waypoint.alt,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    }

    /// Scaled-integer form, answering MISSION_REQUEST_INT.
    pub fn to_mission_item_int(&self) -> MavMessage {
        MavMessage::MISSION_ITEM_INT(MISSION_ITEM_INT_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            seq: self.seq,
            frame: MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT,
            command: MavCmd::MAV_CMD_NAV_WAYPOINT,
            current: 0,
            autocontinue: 0,
            param1: 0.0,
            param2: WAYPOINT_ACCEPT_RADIUS,
            param3: 0.0,
            param4: 0.0,
            x: self.waypoint.lat_e7(),
            y: self.waypoint.lon_e7(),
            z: self.waypoint.alt,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    }
}

/// Ordered item list, indexed by sequence number.
#[derive(Debug, Clone, Default)]
pub struct MissionItems {
    items: Vec<MissionItem>,
}

impl MissionItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Home item followed by `route`, addressed to `(system, component)`.
    pub fn for_route(target: (u8, u8), route: &[Waypoint]) -> Option<Self> {
        let mut items = Self::new();
        for waypoint in core::iter::once(Waypoint::home()).chain(route.iter().copied()) {
            items.add(target.0, target.1, waypoint)?;
        }
        Some(items)
    }

    /// Append an item; its `seq` is its position in the list.
    ///
    /// Returns `None` once the list is full (`u16` sequence space).
    pub fn add(
        &mut self,
        target_system: u8,
        target_component: u8,
        waypoint: Waypoint,
    ) -> Option<u16> {
        let seq = u16::try_from(self.items.len()).ok().filter(|seq| *seq < u16::MAX)?;
        self.items.push(MissionItem {
            target_system,
            target_component,
            seq,
            waypoint,
        });
        Some(seq)
    }

    pub fn count(&self) -> u16 {
        self.items.len() as u16
    }

    pub fn get(&self, seq: u16) -> Option<&MissionItem> {
        self.items.get(seq as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MissionItem> {
        self.items.iter()
    }
}

impl CommandClient {
    /// Upload `waypoints` (after the implicit home item) to the vehicle.
    ///
    /// Returns the vehicle's terminal MISSION_ACK.
    pub fn upload_mission(
        &self,
        address: impl Into<VehicleAddress>,
        waypoints: &[Waypoint],
    ) -> OperationResult {
        let address = address.into();
        crate::log_info!("Uploading {} waypoints to {}", waypoints.len(), address);

        self.run_upload_mission(address, waypoints).map_err(|failure| {
            let err = failure.into_error(address, |cause| format!("Set waypoint failed! {cause}"));
            crate::log_warn!("Mission upload to {} failed: {}", address, err);
            err
        })
    }

    fn run_upload_mission(
        &self,
        address: VehicleAddress,
        waypoints: &[Waypoint],
    ) -> Result<AckMessage, Failure> {
        // Setup
        let mut session = LinkSession::bind(address, &self.config)?;
        if session.wait_heartbeat(self.config.heartbeat_timeout)?.is_none() {
            crate::log_warn!("No heartbeat from {}, uploading anyway", address);
        }
        let (target_system, target_component) = session.target();
        let items = MissionItems::for_route((target_system, target_component), waypoints)
            .ok_or_else(|| {
                Failure::fault(
                    ErrorKind::ProtocolFault,
                    format!("mission too long ({} waypoints)", waypoints.len()),
                )
            })?;
        let count = items.count();
        let timeout_s = timeout_secs(self.config.ack_timeout);
        let responses = &MessageKind::MISSION_RESPONSES;
        let published = || {
            AckRequest::new(responses)
                .timeout(self.config.ack_timeout)
                .published(self.sink.as_ref())
        };

        // Clear
        session.send(&MavMessage::MISSION_CLEAR_ALL(MISSION_CLEAR_ALL_DATA {
            target_system,
            target_component,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        }))?;
        let clear_request = published().labelled(WAYPOINT_CLEAR_ALL_LABEL);
        if await_ack(&mut session, address, &clear_request)?.is_none() {
            crate::log_warn!("No response to MISSION_CLEAR_ALL from {}", address);
        }

        // Count
        crate::log_debug!("Announcing {} mission items to {}", count, address);
        session.send(&MavMessage::MISSION_COUNT(MISSION_COUNT_DATA {
            target_system,
            target_component,
            count,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        }))?;

        // Transfer
        for round in 1..=count {
            let request = await_ack(&mut session, address, &published())?.ok_or_else(|| {
                Failure::fault(
                    ErrorKind::AckTimeout,
                    format!("no item request {round} of {count} (timeout {timeout_s}s)"),
                )
            })?;

            let Some(seq) = request.seq() else {
                return Err(Failure::fault(
                    ErrorKind::ProtocolFault,
                    format!("upload ended before item {round} of {count}: {request}"),
                ));
            };
            let item = items.get(seq).ok_or_else(|| {
                Failure::fault(
                    ErrorKind::ProtocolFault,
                    format!("vehicle requested item {seq}, mission has {count} items"),
                )
            })?;

            crate::log_debug!("Sending mission item {} to {}", seq, address);
            let reply = match request.kind() {
                Some(MessageKind::MissionRequestInt) => item.to_mission_item_int(),
                _ => item.to_mission_item(),
            };
            session.send(&reply)?;
        }

        // Finalize
        let final_request = AckRequest::new(responses).timeout(self.config.ack_timeout);
        let ack = await_ack(&mut session, address, &final_request)?.ok_or_else(|| {
            Failure::fault(
                ErrorKind::AckTimeout,
                format!("no final MISSION_ACK (timeout {timeout_s}s)"),
            )
        })?;
        crate::log_info!("Mission upload to {} finished: {}", address, ack);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_gets_home_item_first() {
        let route = [Waypoint::new(47.1, 8.1, 10.0), Waypoint::new(47.2, 8.2, 15.0)];
        let items = MissionItems::for_route((1, 1), &route).unwrap();

        assert_eq!(items.count(), 3);
        assert_eq!(items.get(0).unwrap().waypoint, Waypoint::home());
        assert_eq!(items.get(2).unwrap().waypoint, route[1]);
        assert!(items.get(3).is_none());
    }

    #[test]
    fn test_seq_matches_position() {
        let route = [Waypoint::new(1.0, 2.0, 3.0); 4];
        let items = MissionItems::for_route((1, 1), &route).unwrap();
        for (index, item) in items.iter().enumerate() {
            assert_eq!(item.seq as usize, index);
        }
    }

    #[test]
    fn test_empty_route_is_home_only() {
        let items = MissionItems::for_route((1, 1), &[]).unwrap();
        assert_eq!(items.count(), 1);
    }

    #[test]
    fn test_item_encodings() {
        let item = MissionItem {
            target_system: 3,
            target_component: 1,
            seq: 2,
            waypoint: Waypoint::new(-35.3632621, 149.1652374, 25.0),
        };

        let MavMessage::MISSION_ITEM(float_item) = item.to_mission_item() else {
            panic!("expected MISSION_ITEM");
        };
        assert_eq!(float_item.seq, 2);
        assert_eq!(float_item.param2, WAYPOINT_ACCEPT_RADIUS);
        assert_eq!(float_item.frame, MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT);

        let MavMessage::MISSION_ITEM_INT(int_item) = item.to_mission_item_int() else {
            panic!("expected MISSION_ITEM_INT");
        };
        assert_eq!(int_item.x, -353_632_621);
        assert_eq!(int_item.y, 1_491_652_374);
        assert_eq!(int_item.target_system, 3);
    }
}
