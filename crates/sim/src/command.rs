//! COMMAND_LONG handling
//!
//! - **MAV_CMD_COMPONENT_ARM_DISARM**: param1 > 0.5 arms, otherwise disarms.
//!   Repeating the current state is accepted.
//! - **MAV_CMD_DO_SET_MODE**: param2 is the custom mode. Modes missing from
//!   the vehicle's table are denied.
//! - Anything else is answered with MAV_RESULT_UNSUPPORTED.
//!
//! With `Behavior::command_acks` off the command still takes effect but no
//! COMMAND_ACK is sent.

use mavlink::common::{MavCmd, MavMessage, MavResult, COMMAND_LONG_DATA};

use crate::telemetry::build_command_ack;
use crate::vehicle::{Behavior, VehicleState};

/// Messages to send back for one COMMAND_LONG.
pub fn handle_command_long(
    cmd: &COMMAND_LONG_DATA,
    state: &mut VehicleState,
    behavior: &Behavior,
) -> Vec<MavMessage> {
    tracing::debug!("Sim received COMMAND_LONG: command={:?}", cmd.command);

    let replies = execute(cmd, state, behavior);
    if behavior.command_acks {
        replies
    } else {
        tracing::warn!("Sim withholding ack for {:?}", cmd.command);
        Vec::new()
    }
}

fn execute(
    cmd: &COMMAND_LONG_DATA,
    state: &mut VehicleState,
    behavior: &Behavior,
) -> Vec<MavMessage> {
    match cmd.command {
        MavCmd::MAV_CMD_COMPONENT_ARM_DISARM => {
            state.armed = cmd.param1 > 0.5;
            tracing::info!("Sim vehicle {}", if state.armed { "armed" } else { "disarmed" });
            vec![build_command_ack(cmd.command, MavResult::MAV_RESULT_ACCEPTED)]
        }
        MavCmd::MAV_CMD_DO_SET_MODE => {
            let mut replies = Vec::new();
            if behavior.stray_ack_before_mode {
                replies.push(build_command_ack(
                    MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
                    MavResult::MAV_RESULT_DENIED,
                ));
            }
            let custom_mode = cmd.param2 as u32;
            let result = if behavior.known_modes.is_empty()
                || behavior.known_modes.contains(&custom_mode)
            {
                state.custom_mode = custom_mode;
                tracing::info!("Sim mode changed to {}", custom_mode);
                MavResult::MAV_RESULT_ACCEPTED
            } else {
                tracing::warn!("Sim rejected unknown mode {}", custom_mode);
                MavResult::MAV_RESULT_DENIED
            };
            replies.push(build_command_ack(cmd.command, result));
            replies
        }
        _ => {
            tracing::warn!("Sim unsupported command: {:?}", cmd.command);
            vec![build_command_ack(cmd.command, MavResult::MAV_RESULT_UNSUPPORTED)]
        }
    }
}
