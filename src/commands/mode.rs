//! Flight mode change
//!
//! The requested name is validated against the mode table of the vehicle type
//! seen in the heartbeat before anything is sent. The ack channel is shared by
//! every command, so the wait only accepts a COMMAND_ACK for
//! `MAV_CMD_DO_SET_MODE`.

use mavlink::common::{MavCmd, MavMessage, MavModeFlag, COMMAND_LONG_DATA};

use super::{CommandClient, Failure, OperationResult};
use crate::communication::mavlink::{await_ack, AckMessage, AckRequest, MessageKind};
use crate::error::{CommandError, ErrorKind};
use crate::types::VehicleAddress;

/// `command` label attached to mode-change acks
pub const SET_MODE_LABEL: &str = "SET_MODE";

/// COMMAND_LONG selecting `custom_mode`.
///
/// param1: MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
/// param2: custom mode number
pub fn set_mode_command(target_system: u8, target_component: u8, custom_mode: u32) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system,
        target_component,
        command: MavCmd::MAV_CMD_DO_SET_MODE,
        confirmation: 0,
        param1: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED.bits() as f32,
        param2: custom_mode as f32,
        param3: 0.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
    })
}

impl CommandClient {
    /// Switch the vehicle at `address` to `mode` (e.g. `"GUIDED"`).
    pub fn change_mode(&self, address: impl Into<VehicleAddress>, mode: &str) -> OperationResult {
        let address = address.into();
        crate::log_info!("Changing mode of {} to {}", address, mode);

        self.run_change_mode(address, mode).map_err(|failure| {
            let err = failure.into_error(address, |_| "Set Mode command failed!".to_string());
            crate::log_warn!("Mode change on {} failed: {}", address, err);
            err
        })
    }

    fn run_change_mode(&self, address: VehicleAddress, mode: &str) -> Result<AckMessage, Failure> {
        let mut session = self.open_session(address)?;

        let table = session.mode_table();
        let Some(custom_mode) = table.custom_mode(mode) else {
            return Err(Failure::Report(CommandError::new(
                ErrorKind::InvalidMode,
                format!("{mode} is not a valid mode. Try: {:?}", table.names()),
                address,
            )));
        };

        let (target_system, target_component) = session.target();
        crate::log_debug!("Sending DO_SET_MODE custom_mode={} to {}", custom_mode, address);
        session.send(&set_mode_command(target_system, target_component, custom_mode))?;

        let request = AckRequest::new(&[MessageKind::CommandAck])
            .correlated_to(MavCmd::MAV_CMD_DO_SET_MODE)
            .labelled(SET_MODE_LABEL)
            .timeout(self.config.ack_timeout);
        await_ack(&mut session, address, &request)?.ok_or_else(|| self.ack_timeout(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mode_command_fields() {
        let MavMessage::COMMAND_LONG(cmd) = set_mode_command(1, 1, 15) else {
            panic!("expected COMMAND_LONG");
        };
        assert_eq!(cmd.command, MavCmd::MAV_CMD_DO_SET_MODE);
        assert_eq!(cmd.target_system, 1);
        assert_eq!(cmd.param1, 1.0);
        assert_eq!(cmd.param2, 15.0);
        assert_eq!(cmd.param3, 0.0);
    }
}
