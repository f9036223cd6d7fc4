//! Flight mode tables
//!
//! Maps mode names to MAVLink custom mode numbers for the vehicle type
//! advertised in a heartbeat. Numbering follows ArduPilot, which is what the
//! mode-change command carries in param2.

use mavlink::common::MavType;

/// Ordered `(name, custom_mode)` table for one vehicle family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTable {
    entries: &'static [(&'static str, u32)],
}

const COPTER_MODES: &[(&str, u32)] = &[
    ("STABILIZE", 0),
    ("ACRO", 1),
    ("ALT_HOLD", 2),
    ("AUTO", 3),
    ("GUIDED", 4),
    ("LOITER", 5),
    ("RTL", 6),
    ("CIRCLE", 7),
    ("LAND", 9),
    ("DRIFT", 11),
    ("SPORT", 13),
    ("FLIP", 14),
    ("AUTOTUNE", 15),
    ("POSHOLD", 16),
    ("BRAKE", 17),
    ("THROW", 18),
    ("AVOID_ADSB", 19),
    ("GUIDED_NOGPS", 20),
    ("SMART_RTL", 21),
    ("FLOWHOLD", 22),
    ("FOLLOW", 23),
    ("ZIGZAG", 24),
    ("SYSTEMID", 25),
    ("AUTOROTATE", 26),
    ("AUTO_RTL", 27),
];

const PLANE_MODES: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("CIRCLE", 1),
    ("STABILIZE", 2),
    ("TRAINING", 3),
    ("ACRO", 4),
    ("FBWA", 5),
    ("FBWB", 6),
    ("CRUISE", 7),
    ("AUTOTUNE", 8),
    ("AUTO", 10),
    ("RTL", 11),
    ("LOITER", 12),
    ("TAKEOFF", 13),
    ("AVOID_ADSB", 14),
    ("GUIDED", 15),
    ("QSTABILIZE", 17),
    ("QHOVER", 18),
    ("QLOITER", 19),
    ("QLAND", 20),
    ("QRTL", 21),
    ("QAUTOTUNE", 22),
    ("QACRO", 23),
    ("THERMAL", 24),
];

const ROVER_MODES: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("ACRO", 1),
    ("STEERING", 3),
    ("HOLD", 4),
    ("LOITER", 5),
    ("FOLLOW", 6),
    ("SIMPLE", 7),
    ("AUTO", 10),
    ("RTL", 11),
    ("SMART_RTL", 12),
    ("GUIDED", 15),
    ("INITIALISING", 16),
];

const SUB_MODES: &[(&str, u32)] = &[
    ("STABILIZE", 0),
    ("ACRO", 1),
    ("ALT_HOLD", 2),
    ("AUTO", 3),
    ("GUIDED", 4),
    ("CIRCLE", 7),
    ("SURFACE", 9),
    ("POSHOLD", 16),
    ("MANUAL", 19),
];

impl ModeTable {
    /// Table for the vehicle type from a heartbeat.
    ///
    /// Types without a known table get an empty one.
    pub fn for_vehicle(mavtype: MavType) -> Self {
        let entries = match mavtype {
            MavType::MAV_TYPE_QUADROTOR
            | MavType::MAV_TYPE_HEXAROTOR
            | MavType::MAV_TYPE_OCTOROTOR
            | MavType::MAV_TYPE_TRICOPTER
            | MavType::MAV_TYPE_COAXIAL
            | MavType::MAV_TYPE_HELICOPTER
            | MavType::MAV_TYPE_DODECAROTOR => COPTER_MODES,
            MavType::MAV_TYPE_FIXED_WING | MavType::MAV_TYPE_VTOL_TILTROTOR => PLANE_MODES,
            MavType::MAV_TYPE_GROUND_ROVER | MavType::MAV_TYPE_SURFACE_BOAT => ROVER_MODES,
            MavType::MAV_TYPE_SUBMARINE => SUB_MODES,
            _ => &[],
        };
        Self { entries }
    }

    /// Custom mode number for `name`, if the vehicle has that mode.
    pub fn custom_mode(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(mode, _)| *mode == name)
            .map(|(_, number)| *number)
    }

    /// Name of a custom mode number (first match).
    pub fn name_of(&self, custom_mode: u32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, number)| *number == custom_mode)
            .map(|(mode, _)| *mode)
    }

    /// Valid mode names, in table order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(mode, _)| *mode).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
