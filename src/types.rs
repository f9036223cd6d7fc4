use core::fmt;

use serde::{Deserialize, Serialize};

/// Vehicle connection endpoint (host-local UDP port the vehicle talks to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleAddress(pub u16);

impl VehicleAddress {
    /// Numeric value as exposed in `droneid`.
    pub fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for VehicleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for VehicleAddress {
    fn from(port: u16) -> Self {
        Self(port)
    }
}

/// Geographic route point with altitude relative to home.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in meters above home.
    pub alt: f32,
}

impl Waypoint {
    pub const fn new(lat: f64, lon: f64, alt: f32) -> Self {
        Self { lat, lon, alt }
    }

    /// Placeholder item 0 of every uploaded mission.
    pub const fn home() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Latitude scaled to degE7 for MISSION_ITEM_INT.
    pub fn lat_e7(&self) -> i32 {
        (self.lat * 1e7).round() as i32
    }

    /// Longitude scaled to degE7 for MISSION_ITEM_INT.
    pub fn lon_e7(&self) -> i32 {
        (self.lon * 1e7).round() as i32
    }
}

impl From<(f64, f64, f32)> for Waypoint {
    fn from((lat, lon, alt): (f64, f64, f32)) -> Self {
        Self::new(lat, lon, alt)
    }
}
