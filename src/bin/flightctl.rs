//! Command-line front end for flight_link operations.
//!
//! Usage:
//!   cargo run --bin flightctl -- [--host IP] [--timeout-ms MS] <COMMAND> <ADDRESS> ...
//!
//! Prints the operation result as JSON (an ack, or `{"ERROR": .., "droneid": ..}`).
//! Exit status is 1 when the result is an error.

use std::net::IpAddr;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use flight_link::{result_to_json, CommandClient, LinkConfig, Waypoint};

#[derive(Debug, Parser)]
#[command(name = "flightctl", about = "Send MAVLink commands to a vehicle")]
struct Cli {
    /// Local address to listen on (default: FLIGHT_LINK_HOST or 0.0.0.0)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Heartbeat and ack timeout in milliseconds (default: 6000)
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Change flight mode
    Mode { address: u16, mode: String },
    /// Arm the vehicle
    Arm { address: u16 },
    /// Disarm the vehicle
    Disarm { address: u16 },
    /// Fly straight to one point
    Goto {
        address: u16,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        alt: f32,
    },
    /// Upload a mission given as `lat,lon,alt` triples
    Mission {
        address: u16,
        #[arg(value_parser = parse_waypoint, allow_hyphen_values = true)]
        waypoints: Vec<Waypoint>,
    },
}

fn parse_waypoint(raw: &str) -> Result<Waypoint, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [lat, lon, alt] = parts.as_slice() else {
        return Err(format!("expected lat,lon,alt, got `{raw}`"));
    };
    let lat = lat.parse().map_err(|_| format!("invalid latitude `{lat}`"))?;
    let lon = lon.parse().map_err(|_| format!("invalid longitude `{lon}`"))?;
    let alt = alt.parse().map_err(|_| format!("invalid altitude `{alt}`"))?;
    Ok(Waypoint::new(lat, lon, alt))
}

fn main() {
    flight_link::logging::init();
    let cli = Cli::parse();

    let mut config = LinkConfig::from_env();
    if let Some(host) = cli.host {
        config = config.with_host(host);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms.max(1)));
    }
    let client = CommandClient::new(config);

    let result = match cli.command {
        Command::Mode { address, mode } => client.change_mode(address, &mode),
        Command::Arm { address } => client.set_arm(address, false),
        Command::Disarm { address } => client.set_arm(address, true),
        Command::Goto {
            address,
            lat,
            lon,
            alt,
        } => client.fly_to_point(address, lat, lon, alt),
        Command::Mission { address, waypoints } => client.upload_mission(address, &waypoints),
    };

    println!("{}", result_to_json(&result));
    if result.is_err() {
        process::exit(1);
    }
}
