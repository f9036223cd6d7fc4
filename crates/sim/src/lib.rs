//! Scripted MAVLink vehicle for loopback tests.
//!
//! Answers arm/disarm, mode changes, guided go-to and the mission upload
//! handshake. `Behavior` scripts the deviations a real vehicle can show:
//! silence, odd request orders, stray acks.

pub mod command;
pub mod error;
pub mod mission;
pub mod telemetry;
pub mod vehicle;

pub use error::SimError;
pub use mission::{MissionResponder, UploadState, UploadedItem};
pub use vehicle::{free_port, Behavior, SimVehicle, VehicleState, HEARTBEAT_INTERVAL};
