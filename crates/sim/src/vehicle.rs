//! Simulated vehicle on a loopback UDP link.
//!
//! The vehicle runs on its own thread. It sends heartbeats to
//! `127.0.0.1:{gcs_port}`, answers commands and mission traffic from
//! whoever talks to it, and records every message it receives.

use std::io::{self, Cursor};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mavlink::common::{MavMessage, MavType};
use mavlink::peek_reader::PeekReader;
use mavlink::{MavHeader, Message};

use crate::command::handle_command_long;
use crate::error::SimError;
use crate::mission::{MissionResponder, UploadedItem};
use crate::telemetry::build_heartbeat;

/// Heartbeat period
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Socket read timeout, bounds how late a stop request is noticed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Largest MAVLink v2 frame
const MAX_FRAME_LEN: usize = 280;

/// How the vehicle behaves.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub system_id: u8,
    pub component_id: u8,
    pub mavtype: MavType,
    /// Send heartbeats at all.
    pub heartbeat: bool,
    /// Answer MISSION_CLEAR_ALL with MISSION_ACK.
    pub ack_clear: bool,
    /// Request items with MISSION_REQUEST_INT (otherwise MISSION_REQUEST).
    pub request_int: bool,
    /// Sequence numbers to request, in order (ascending when `None`).
    pub request_order: Option<Vec<u16>>,
    /// Never answer MISSION_COUNT.
    pub silent_on_count: bool,
    /// Emit an unrelated COMMAND_ACK before answering DO_SET_MODE.
    pub stray_ack_before_mode: bool,
    /// Custom modes accepted by DO_SET_MODE (any when empty).
    pub known_modes: Vec<u32>,
    /// Answer COMMAND_LONG with COMMAND_ACK.
    pub command_acks: bool,
    /// Answer a guided go-to item with MISSION_ACK.
    pub goto_ack: bool,
    /// Answer MISSION_COUNT with an error MISSION_ACK instead of a request.
    pub early_mission_ack: bool,
    /// Send the terminal MISSION_ACK after the last item.
    pub final_ack: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            system_id: 1,
            component_id: 1,
            mavtype: MavType::MAV_TYPE_GROUND_ROVER,
            heartbeat: true,
            ack_clear: true,
            request_int: true,
            request_order: None,
            silent_on_count: false,
            stray_ack_before_mode: false,
            known_modes: Vec::new(),
            command_acks: true,
            goto_ack: true,
            early_mission_ack: false,
            final_ack: true,
        }
    }
}

impl Behavior {
    pub fn with_mavtype(mut self, mavtype: MavType) -> Self {
        self.mavtype = mavtype;
        self
    }

    pub fn without_heartbeat(mut self) -> Self {
        self.heartbeat = false;
        self
    }

    pub fn without_clear_ack(mut self) -> Self {
        self.ack_clear = false;
        self
    }

    pub fn with_float_requests(mut self) -> Self {
        self.request_int = false;
        self
    }

    pub fn with_request_order(mut self, order: &[u16]) -> Self {
        self.request_order = Some(order.to_vec());
        self
    }

    pub fn with_silent_on_count(mut self) -> Self {
        self.silent_on_count = true;
        self
    }

    pub fn with_stray_ack_before_mode(mut self) -> Self {
        self.stray_ack_before_mode = true;
        self
    }

    pub fn with_known_modes(mut self, modes: &[u32]) -> Self {
        self.known_modes = modes.to_vec();
        self
    }

    pub fn without_command_acks(mut self) -> Self {
        self.command_acks = false;
        self
    }

    pub fn without_goto_ack(mut self) -> Self {
        self.goto_ack = false;
        self
    }

    pub fn with_early_mission_ack(mut self) -> Self {
        self.early_mission_ack = true;
        self
    }

    pub fn without_final_ack(mut self) -> Self {
        self.final_ack = false;
        self
    }
}

/// Observable vehicle state.
#[derive(Debug, Clone, Default)]
pub struct VehicleState {
    pub armed: bool,
    pub custom_mode: u32,
    /// Items of the last upload, in arrival order.
    pub mission: Vec<UploadedItem>,
    /// Last guided go-to target.
    pub goto: Option<UploadedItem>,
    /// Every message received, in arrival order.
    pub received: Vec<MavMessage>,
}

/// A running simulated vehicle. Stops when dropped.
pub struct SimVehicle {
    state: Arc<Mutex<VehicleState>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl SimVehicle {
    /// Start a vehicle that heartbeats to `127.0.0.1:{gcs_port}`.
    pub fn spawn(gcs_port: u16, behavior: Behavior) -> Result<Self, SimError> {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;
        let gcs_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, gcs_port));

        let state = Arc::new(Mutex::new(VehicleState::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let mut link = VehicleLink {
            socket,
            gcs_addr,
            behavior,
            sequence: 0,
            state: Arc::clone(&state),
            stop: Arc::clone(&stop),
            mission: MissionResponder::new(),
        };
        let handle = thread::Builder::new()
            .name(format!("sim-vehicle-{gcs_port}"))
            .spawn(move || link.run())?;

        tracing::debug!("Sim vehicle {} targeting {}", local_addr, gcs_addr);

        Ok(Self {
            state,
            stop,
            handle: Some(handle),
            local_addr,
        })
    }

    /// Snapshot of the vehicle state.
    pub fn state(&self) -> VehicleState {
        lock(&self.state).clone()
    }

    pub fn armed(&self) -> bool {
        lock(&self.state).armed
    }

    pub fn custom_mode(&self) -> u32 {
        lock(&self.state).custom_mode
    }

    pub fn mission(&self) -> Vec<UploadedItem> {
        lock(&self.state).mission.clone()
    }

    pub fn goto(&self) -> Option<UploadedItem> {
        lock(&self.state).goto
    }

    pub fn received(&self) -> Vec<MavMessage> {
        lock(&self.state).received.clone()
    }

    /// Number of received messages named `name` (e.g. `"MISSION_COUNT"`).
    pub fn received_count(&self, name: &str) -> usize {
        lock(&self.state)
            .received
            .iter()
            .filter(|msg| msg.message_name() == name)
            .count()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the vehicle thread and wait for it.
    pub fn shutdown(mut self) -> Result<(), SimError> {
        self.stop_thread()
    }

    fn stop_thread(&mut self) -> Result<(), SimError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| SimError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for SimVehicle {
    fn drop(&mut self) {
        if let Err(e) = self.stop_thread() {
            tracing::warn!("Sim vehicle {} stopped uncleanly: {}", self.local_addr, e);
        }
    }
}

/// Reserve an unused loopback UDP port.
///
/// The port is released before returning, so another process could take it.
pub fn free_port() -> Result<u16, SimError> {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(socket.local_addr()?.port())
}

fn lock(state: &Mutex<VehicleState>) -> MutexGuard<'_, VehicleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Vehicle side of the link, owned by the vehicle thread.
struct VehicleLink {
    socket: UdpSocket,
    gcs_addr: SocketAddr,
    behavior: Behavior,
    sequence: u8,
    state: Arc<Mutex<VehicleState>>,
    stop: Arc<AtomicBool>,
    mission: MissionResponder,
}

impl VehicleLink {
    fn run(&mut self) {
        let mut buf = vec![0u8; 4 * MAX_FRAME_LEN];
        let mut last_heartbeat: Option<Instant> = None;

        while !self.stop.load(Ordering::Relaxed) {
            if self.behavior.heartbeat
                && last_heartbeat.map_or(true, |at| at.elapsed() >= HEARTBEAT_INTERVAL)
            {
                last_heartbeat = Some(Instant::now());
                let heartbeat = {
                    let state = lock(&self.state);
                    build_heartbeat(self.behavior.mavtype, state.custom_mode, state.armed)
                };
                self.send(&heartbeat, self.gcs_addr);
            }

            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    for (header, msg) in parse_datagram(&buf[..len]) {
                        for reply in self.respond(&header, &msg) {
                            self.send(&reply, from);
                        }
                    }
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) => {}
                Err(e) => tracing::trace!("Sim receive error: {}", e),
            }
        }
    }

    fn respond(&mut self, header: &MavHeader, msg: &MavMessage) -> Vec<MavMessage> {
        let gcs = (header.system_id, header.component_id);
        let mut state = lock(&self.state);
        state.received.push(msg.clone());

        match msg {
            MavMessage::COMMAND_LONG(cmd) => handle_command_long(cmd, &mut state, &self.behavior),
            _ => self.mission.handle(msg, gcs, &mut state, &self.behavior),
        }
    }

    fn send(&mut self, msg: &MavMessage, to: SocketAddr) {
        let header = MavHeader {
            system_id: self.behavior.system_id,
            component_id: self.behavior.component_id,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);

        let mut frame = Cursor::new(Vec::with_capacity(MAX_FRAME_LEN));
        if let Err(e) = mavlink::write_v2_msg(&mut frame, header, msg) {
            tracing::warn!("Sim could not encode {}: {:?}", msg.message_name(), e);
            return;
        }
        // Fails harmlessly while nothing listens on the ground side.
        if let Err(e) = self.socket.send_to(&frame.into_inner(), to) {
            tracing::trace!("Sim send to {} failed: {}", to, e);
        }
    }
}

/// Every v2 frame in one datagram.
fn parse_datagram(data: &[u8]) -> Vec<(MavHeader, MavMessage)> {
    let mut reader = PeekReader::new(Cursor::new(data));
    let mut frames = Vec::new();
    while let Ok(frame) = mavlink::read_v2_msg::<MavMessage, _>(&mut reader) {
        frames.push(frame);
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeats_reach_gcs_port() {
        let gcs = UdpSocket::bind("127.0.0.1:0").unwrap();
        gcs.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let vehicle =
            SimVehicle::spawn(gcs.local_addr().unwrap().port(), Behavior::default()).unwrap();

        let mut buf = [0u8; MAX_FRAME_LEN];
        let (len, from) = gcs.recv_from(&mut buf).unwrap();
        assert_eq!(from, vehicle.local_addr());
        let frames = parse_datagram(&buf[..len]);
        assert!(matches!(frames[0].1, MavMessage::HEARTBEAT(_)));
        assert_eq!(frames[0].0.system_id, 1);
    }

    #[test]
    fn test_silent_vehicle_sends_nothing() {
        let gcs = UdpSocket::bind("127.0.0.1:0").unwrap();
        gcs.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
        let _vehicle = SimVehicle::spawn(
            gcs.local_addr().unwrap().port(),
            Behavior::default().without_heartbeat(),
        )
        .unwrap();

        let mut buf = [0u8; MAX_FRAME_LEN];
        assert!(gcs.recv_from(&mut buf).is_err());
    }

    #[test]
    fn test_shutdown_joins_thread() {
        let vehicle = SimVehicle::spawn(free_port().unwrap(), Behavior::default()).unwrap();
        assert!(vehicle.shutdown().is_ok());
    }
}
