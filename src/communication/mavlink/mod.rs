//! MAVLink link layer for ground-side commands
//!
//! # Architecture
//!
//! - **Frame**: v1/v2 frame splitting and v2 encoding
//! - **Session**: UDP link to one vehicle, heartbeat handshake, send/receive
//! - **Correlator**: bounded wait for a matching response, decorated as an ack
//! - **Ack**: field-map view of vehicle responses and the result-code table
//! - **Modes**: per-vehicle-type flight mode tables
//! - **Broadcast**: fire-and-forget sink for live UI updates
//!
//! # Transport
//!
//! UDP only. The session listens on `host:address` and replies to whichever
//! endpoint sent the first heartbeat.

pub mod ack; // Ack messages and result descriptions
pub mod broadcast; // Broadcast sinks
pub mod correlator; // Ack correlation
pub mod frame; // Frame encoding/decoding
pub mod modes; // Flight mode tables
pub mod session; // Link session

pub use ack::{AckMessage, MessageKind};
pub use broadcast::{BroadcastSink, ChannelSink, NullSink};
pub use correlator::{await_ack, AckRequest};
pub use modes::ModeTable;
pub use session::{LinkSession, VehicleIdentity};
