//! Outgoing message builders.

use mavlink::common::*;

/// HEARTBEAT for a vehicle of `mavtype` in `custom_mode`.
pub fn build_heartbeat(mavtype: MavType, custom_mode: u32, armed: bool) -> MavMessage {
    let mut base_mode = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED;
    if armed {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED;
    }

    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode,
        mavtype,
        autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
        base_mode,
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

/// COMMAND_ACK for `command`.
pub fn build_command_ack(command: MavCmd, result: MavResult) -> MavMessage {
    MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
        command,
        result,
        progress: 0,
        result_param2: 0,
        target_system: 0,
        target_component: 0,
    })
}

/// MISSION_ACK addressed to the ground station.
pub fn build_mission_ack(target: (u8, u8), result: MavMissionResult) -> MavMessage {
    MavMessage::MISSION_ACK(MISSION_ACK_DATA {
        target_system: target.0,
        target_component: target.1,
        mavtype: result,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        opaque_id: 0,
    })
}

/// MISSION_REQUEST_INT, or the float-era MISSION_REQUEST when `int` is false.
pub fn build_item_request(target: (u8, u8), seq: u16, int: bool) -> MavMessage {
    if int {
        MavMessage::MISSION_REQUEST_INT(MISSION_REQUEST_INT_DATA {
            target_system: target.0,
            target_component: target.1,
            seq,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    } else {
        MavMessage::MISSION_REQUEST(MISSION_REQUEST_DATA {
            target_system: target.0,
            target_component: target.1,
            seq,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_armed_flag() {
        let MavMessage::HEARTBEAT(hb) = build_heartbeat(MavType::MAV_TYPE_QUADROTOR, 4, true)
        else {
            panic!("expected HEARTBEAT");
        };
        assert_eq!(hb.custom_mode, 4);
        assert!(hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED));
    }

    #[test]
    fn test_item_request_kind() {
        assert!(matches!(
            build_item_request((255, 0), 1, true),
            MavMessage::MISSION_REQUEST_INT(_)
        ));
        assert!(matches!(
            build_item_request((255, 0), 1, false),
            MavMessage::MISSION_REQUEST(_)
        ));
    }
}
