use mavlink::common::{MavCmd, MavMessage, COMMAND_LONG_DATA};

use super::{CommandClient, Failure, OperationResult};
use crate::communication::mavlink::{await_ack, AckMessage, AckRequest, MessageKind};
use crate::types::VehicleAddress;

/// COMMAND_LONG `MAV_CMD_COMPONENT_ARM_DISARM`.
///
/// param1: 1.0 to arm, 0.0 to disarm. All other params zero.
/// This is the MAVLink meaning of param1; do not invert it for `disarm`.
pub fn arm_disarm_command(target_system: u8, target_component: u8, disarm: bool) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system,
        target_component,
        command: MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
        confirmation: 0,
        param1: if disarm { 0.0 } else { 1.0 },
        param2: 0.0,
        param3: 0.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
    })
}

impl CommandClient {
    /// Arm the vehicle at `address`, or disarm it when `disarm` is set.
    pub fn set_arm(&self, address: impl Into<VehicleAddress>, disarm: bool) -> OperationResult {
        let address = address.into();
        let action = if disarm { "Disarming" } else { "Arming" };
        crate::log_info!("{} {}", action, address);

        self.run_set_arm(address, disarm).map_err(|failure| {
            let err =
                failure.into_error(address, |cause| format!("Arm/Disarm command failed! {cause}"));
            crate::log_warn!("Arm/disarm on {} failed: {}", address, err);
            err
        })
    }

    fn run_set_arm(&self, address: VehicleAddress, disarm: bool) -> Result<AckMessage, Failure> {
        let mut session = self.open_session(address)?;

        let (target_system, target_component) = session.target();
        session.send(&arm_disarm_command(target_system, target_component, disarm))?;

        let request = AckRequest::new(&[MessageKind::CommandAck]).timeout(self.config.ack_timeout);
        await_ack(&mut session, address, &request)?.ok_or_else(|| self.ack_timeout(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_sets_param1() {
        let MavMessage::COMMAND_LONG(cmd) = arm_disarm_command(1, 1, false) else {
            panic!("expected COMMAND_LONG");
        };
        assert_eq!(cmd.command, MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
        assert_eq!(cmd.param1, 1.0);
    }

    #[test]
    fn test_param1_follows_mavlink_meaning() {
        let param1 = |disarm| match arm_disarm_command(1, 1, disarm) {
            MavMessage::COMMAND_LONG(cmd) => cmd.param1,
            _ => panic!("expected COMMAND_LONG"),
        };
        assert!(param1(false) > 0.5);
        assert!(param1(true) < 0.5);
    }

    #[test]
    fn test_disarm_clears_param1() {
        let MavMessage::COMMAND_LONG(cmd) = arm_disarm_command(1, 1, true) else {
            panic!("expected COMMAND_LONG");
        };
        assert_eq!(cmd.param1, 0.0);
        assert_eq!(cmd.param2, 0.0);
    }
}
