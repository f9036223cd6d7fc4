//! MAVLink frame encoding and datagram splitting
//!
//! A UDP datagram may carry one or several MAVLink frames, in either protocol
//! version. Frames are located by magic byte and sized from their header:
//!
//! - v1 (`0xFE`): 6-byte header + payload + 2-byte checksum
//! - v2 (`0xFD`): 10-byte header + payload + 2-byte checksum, plus a 13-byte
//!   signature when incompat flag bit 0 is set
//!
//! Bytes that cannot be parsed are skipped; decoding never fails the caller.

use std::io::Cursor;

use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;

use crate::error::LinkError;

/// MAVLink v1 start-of-frame marker
pub const MAGIC_V1: u8 = 0xFE;

/// MAVLink v2 start-of-frame marker
pub const MAGIC_V2: u8 = 0xFD;

/// Largest possible MAVLink frame (v2, signed, 255-byte payload)
pub const MAX_FRAME_LEN: usize = 280;

/// Ground station system ID used for outgoing frames
pub const GCS_SYSTEM_ID: u8 = 255;

/// Ground station component ID used for outgoing frames
pub const GCS_COMPONENT_ID: u8 = 0;

/// Total frame length announced by a header starting at `buf[0]`.
fn frame_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 2 {
        return None;
    }
    let payload_len = buf[1] as usize;
    match buf[0] {
        MAGIC_V2 => {
            let base = 12 + payload_len;
            if buf.len() >= 3 && (buf[2] & 0x01) != 0 {
                Some(base + 13)
            } else {
                Some(base)
            }
        }
        MAGIC_V1 => Some(8 + payload_len),
        _ => None,
    }
}

/// Decode every frame found in a datagram.
pub fn decode_datagram(data: &[u8]) -> Vec<(MavHeader, MavMessage)> {
    let mut messages = Vec::new();
    let mut rest = data;

    loop {
        let Some(pos) = rest.iter().position(|&b| b == MAGIC_V1 || b == MAGIC_V2) else {
            break;
        };
        rest = &rest[pos..];

        let Some(len) = frame_len(rest) else {
            break;
        };
        if rest.len() < len {
            crate::log_trace!("Truncated frame: need {} bytes, have {}", len, rest.len());
            break;
        }

        let frame = &rest[..len];
        let mut reader = PeekReader::new(Cursor::new(frame));
        let result = if frame[0] == MAGIC_V2 {
            mavlink::read_v2_msg::<MavMessage, _>(&mut reader)
        } else {
            mavlink::read_v1_msg::<MavMessage, _>(&mut reader)
        };

        match result {
            Ok(msg) => {
                messages.push(msg);
                rest = &rest[len..];
            }
            Err(_) => {
                // Resynchronise one byte past the bogus magic.
                crate::log_trace!("Dropping unparsable frame");
                rest = &rest[1..];
            }
        }
    }

    messages
}

/// Encode a message as a MAVLink v2 frame.
pub fn encode_v2(header: MavHeader, msg: &MavMessage) -> Result<Vec<u8>, LinkError> {
    let mut buf = Cursor::new(Vec::with_capacity(MAX_FRAME_LEN));
    mavlink::write_v2_msg(&mut buf, header, msg)
        .map_err(|e| LinkError::ProtocolError(format!("encode failed: {e:?}")))?;
    Ok(buf.into_inner())
}

/// Header for the `sequence`-th frame sent by this ground station.
pub fn gcs_header(sequence: u8) -> MavHeader {
    MavHeader {
        system_id: GCS_SYSTEM_ID,
        component_id: GCS_COMPONENT_ID,
        sequence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::*;

    fn heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 4,
            mavtype: MavType::MAV_TYPE_GROUND_ROVER,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_STANDBY,
            mavlink_version: 3,
        })
    }

    fn vehicle_header() -> MavHeader {
        MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: 7,
        }
    }

    #[test]
    fn test_decode_v2_frame() {
        let bytes = encode_v2(vehicle_header(), &heartbeat()).unwrap();
        let decoded = decode_datagram(&bytes);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0.system_id, 1);
        assert!(matches!(decoded[0].1, MavMessage::HEARTBEAT(_)));
    }

    #[test]
    fn test_decode_v1_frame() {
        let mut buf = Cursor::new(Vec::new());
        mavlink::write_v1_msg(&mut buf, vehicle_header(), &heartbeat()).unwrap();
        let decoded = decode_datagram(&buf.into_inner());
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0.sequence, 7);
    }

    #[test]
    fn test_decode_several_frames_with_leading_noise() {
        let ack = MavMessage::MISSION_ACK(MISSION_ACK_DATA {
            target_system: GCS_SYSTEM_ID,
            target_component: GCS_COMPONENT_ID,
            mavtype: MavMissionResult::MAV_MISSION_ACCEPTED,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        });
        let mut data = vec![0x00, 0x42];
        data.extend(encode_v2(vehicle_header(), &heartbeat()).unwrap());
        data.extend(encode_v2(vehicle_header(), &ack).unwrap());

        let decoded = decode_datagram(&data);
        assert_eq!(decoded.len(), 2);
        assert!(matches!(decoded[1].1, MavMessage::MISSION_ACK(_)));
    }

    #[test]
    fn test_truncated_frame_is_ignored() {
        let bytes = encode_v2(vehicle_header(), &heartbeat()).unwrap();
        assert!(decode_datagram(&bytes[..bytes.len() - 3]).is_empty());
        assert!(decode_datagram(&[]).is_empty());
    }

    #[test]
    fn test_gcs_header_ids() {
        let header = gcs_header(3);
        assert_eq!(header.system_id, 255);
        assert_eq!(header.component_id, 0);
        assert_eq!(header.sequence, 3);
    }
}
