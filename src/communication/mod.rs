//! Communication Protocols
//!
//! # Protocols
//!
//! - **MAVLink**: ground-to-vehicle command link
//!   - Heartbeat handshake
//!   - Command execution (COMMAND_LONG / COMMAND_ACK)
//!   - Mission protocol (MISSION_* messages)
//!
//! # Transport Layers
//!
//! - UDP (listening side, one socket per operation)

pub mod mavlink;
