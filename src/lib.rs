//! flight_link - Ground-side MAVLink command client
//!
//! Issues flight-control commands to a vehicle over a UDP telemetry link and
//! interprets its acknowledgments: mode change, arm/disarm, single-point
//! navigation and mission upload.
//!
//! ```no_run
//! use flight_link::{CommandClient, LinkConfig, Waypoint};
//!
//! let client = CommandClient::new(LinkConfig::default());
//! match client.upload_mission(14551, &[Waypoint::new(47.39, 8.54, 20.0)]) {
//!     Ok(ack) => println!("{ack}"),
//!     Err(err) => println!("{}", err.to_json()),
//! }
//! ```

// Logging macros (must come first so later modules can use them)
pub mod logging;

pub mod commands;
pub mod communication;
pub mod config;
pub mod error;
pub mod types;

pub use commands::{
    change_mode, fly_to_point, result_to_json, set_arm, upload_mission, CommandClient,
    OperationResult,
};
pub use communication::mavlink::{AckMessage, BroadcastSink, ChannelSink, MessageKind, NullSink};
pub use config::LinkConfig;
pub use error::{CommandError, ErrorKind, LinkError};
pub use types::{VehicleAddress, Waypoint};
