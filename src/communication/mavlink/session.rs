//! Link session to one vehicle
//!
//! A session listens on `host:address` over UDP, learns the vehicle endpoint
//! and identity from its first heartbeat, and from then on exchanges MAVLink
//! frames with that endpoint only.
//!
//! # Lifecycle
//!
//! 1. `bind` opens the socket (no traffic yet)
//! 2. `wait_heartbeat` blocks until the vehicle announces itself or the
//!    timeout elapses
//! 3. `send` / `recv_match` exchange commands and responses
//! 4. Dropping the session closes the socket
//!
//! `connect` does steps 1 and 2 and fails with `LinkError::NoHeartbeat` when
//! the vehicle stays silent.
//!
//! Sessions are never shared: every operation opens its own and drops it on
//! return. The socket is bound with `SO_REUSEADDR`, so concurrent operations
//! on one vehicle address each get their own session.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use mavlink::common::{MavMessage, HEARTBEAT_DATA};
use mavlink::MavHeader;
use socket2::{Domain, Protocol, Socket, Type};

use super::frame::{decode_datagram, encode_v2, gcs_header, MAX_FRAME_LEN};
use super::modes::ModeTable;
use crate::config::{timeout_secs, LinkConfig};
use crate::error::LinkError;
use crate::types::VehicleAddress;

/// Receive buffer, large enough for several frames per datagram.
const RECV_BUF_LEN: usize = 4 * MAX_FRAME_LEN;

/// Upper bound on a single blocking read, so deadlines are re-checked.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identity negotiated from the vehicle's heartbeat.
#[derive(Debug, Clone)]
pub struct VehicleIdentity {
    /// System ID to address commands to.
    pub target_system: u8,
    /// Component ID to address commands to.
    pub target_component: u8,
    /// Heartbeat payload (vehicle type, autopilot, current mode).
    pub heartbeat: HEARTBEAT_DATA,
}

/// Live UDP link to one vehicle.
pub struct LinkSession {
    address: VehicleAddress,
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    identity: Option<VehicleIdentity>,
    sequence: u8,
    recv_buf: Vec<u8>,
}

impl LinkSession {
    /// Open the listening socket on `host:address`.
    pub fn bind(address: VehicleAddress, config: &LinkConfig) -> Result<Self, LinkError> {
        let bind_addr = SocketAddr::new(config.host, address.value());
        let socket = bind_reusable(bind_addr)
            .map_err(|e| LinkError::ConnectionFailed(format!("bind {bind_addr}: {e}")))?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;

        crate::log_debug!("Link {} listening on {}", address, bind_addr);

        Ok(Self {
            address,
            socket,
            peer: None,
            identity: None,
            sequence: 0,
            recv_buf: vec![0u8; RECV_BUF_LEN],
        })
    }

    /// Bind and wait for the first heartbeat.
    pub fn connect(address: VehicleAddress, config: &LinkConfig) -> Result<Self, LinkError> {
        let mut session = Self::bind(address, config)?;
        match session.wait_heartbeat(config.heartbeat_timeout)? {
            Some(_) => Ok(session),
            None => Err(LinkError::NoHeartbeat {
                address,
                timeout_s: timeout_secs(config.heartbeat_timeout),
            }),
        }
    }

    /// Block until a heartbeat arrives; `None` on timeout.
    ///
    /// The heartbeat's sender becomes the session peer and its header IDs the
    /// command target.
    pub fn wait_heartbeat(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<VehicleIdentity>, LinkError> {
        let received = self.recv_match(|msg| matches!(msg, MavMessage::HEARTBEAT(_)), timeout)?;
        let Some((header, MavMessage::HEARTBEAT(heartbeat))) = received else {
            crate::log_warn!("No heartbeat from {} within {:?}", self.address, timeout);
            return Ok(None);
        };

        let identity = VehicleIdentity {
            target_system: header.system_id,
            target_component: header.component_id,
            heartbeat,
        };
        crate::log_info!(
            "Heartbeat from {}: system {} component {} type {:?}",
            self.address,
            identity.target_system,
            identity.target_component,
            identity.heartbeat.mavtype
        );
        self.identity = Some(identity.clone());
        Ok(Some(identity))
    }

    /// Block until a message satisfying `filter` arrives; `None` on timeout.
    ///
    /// Messages that do not match are discarded. A heartbeat received before
    /// any peer is known sets the peer; after that, datagrams from any other
    /// endpoint are ignored.
    pub fn recv_match<F>(
        &mut self,
        filter: F,
        timeout: Duration,
    ) -> Result<Option<(MavHeader, MavMessage)>, LinkError>
    where
        F: Fn(&MavMessage) -> bool,
    {
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let wait = (deadline - now).min(POLL_INTERVAL);
            self.socket.set_read_timeout(Some(wait))?;

            let (len, from) = match self.socket.recv_from(&mut self.recv_buf) {
                Ok(received) => received,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::ConnectionRefused
                            | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            };

            if self.peer.is_some_and(|peer| peer != from) {
                crate::log_trace!("Link {}: ignoring datagram from {}", self.address, from);
                continue;
            }

            for (header, msg) in decode_datagram(&self.recv_buf[..len]) {
                if self.peer.is_none() && matches!(msg, MavMessage::HEARTBEAT(_)) {
                    self.peer = Some(from);
                }
                if filter(&msg) {
                    crate::log_trace!("Matched message from {}: {:?}", from, header);
                    return Ok(Some((header, msg)));
                }
            }
        }
    }

    /// Send a message to the vehicle.
    ///
    /// Dropped (with a debug log) while no peer is known, as there is nowhere
    /// to send it.
    pub fn send(&mut self, msg: &MavMessage) -> Result<(), LinkError> {
        let Some(peer) = self.peer else {
            crate::log_debug!("Link {}: no peer yet, dropping outgoing message", self.address);
            return Ok(());
        };

        let header = gcs_header(self.sequence);
        self.sequence = self.sequence.wrapping_add(1);

        let bytes = encode_v2(header, msg)?;
        self.socket.send_to(&bytes, peer)?;
        Ok(())
    }

    pub fn address(&self) -> VehicleAddress {
        self.address
    }

    /// Identity from the last heartbeat, if one was seen.
    pub fn identity(&self) -> Option<&VehicleIdentity> {
        self.identity.as_ref()
    }

    /// `(target_system, target_component)` for outgoing commands.
    ///
    /// Zero (broadcast) until a heartbeat has been seen.
    pub fn target(&self) -> (u8, u8) {
        self.identity
            .as_ref()
            .map(|id| (id.target_system, id.target_component))
            .unwrap_or((0, 0))
    }

    /// Mode table for the vehicle type announced in the heartbeat.
    pub fn mode_table(&self) -> ModeTable {
        match &self.identity {
            Some(id) => ModeTable::for_vehicle(id.heartbeat.mavtype),
            None => ModeTable::for_vehicle(mavlink::common::MavType::MAV_TYPE_GENERIC),
        }
    }

    /// Local socket address (useful when bound to port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }

    /// Vehicle endpoint learned from the heartbeat.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

/// UDP socket bound to `addr` with `SO_REUSEADDR` set.
fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

impl Drop for LinkSession {
    fn drop(&mut self) {
        crate::log_debug!("Link {} closed", self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback() -> LinkConfig {
        LinkConfig::loopback().with_timeout(Duration::from_millis(300))
    }

    fn heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_GROUND_ROVER,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        })
    }

    fn send_from(vehicle: &UdpSocket, to: SocketAddr, msg: &MavMessage) {
        let header = MavHeader {
            system_id: 7,
            component_id: 1,
            sequence: 0,
        };
        vehicle.send_to(&encode_v2(header, msg).unwrap(), to).unwrap();
    }

    #[test]
    fn test_bind_ephemeral() {
        let session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let local = session.local_addr().unwrap();
        assert_eq!(local.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(session.peer().is_none());
        assert_eq!(session.target(), (0, 0));
    }

    #[test]
    fn test_heartbeat_timeout_returns_none() {
        let mut session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let started = Instant::now();
        let identity = session.wait_heartbeat(Duration::from_millis(200)).unwrap();
        assert!(identity.is_none());
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn test_heartbeat_sets_identity_and_peer() {
        let mut session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let gcs = session.local_addr().unwrap();
        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        send_from(&vehicle, gcs, &heartbeat());

        let identity = session
            .wait_heartbeat(Duration::from_secs(2))
            .unwrap()
            .expect("heartbeat");
        assert_eq!(identity.target_system, 7);
        assert_eq!(session.target(), (7, 1));
        assert_eq!(session.peer(), Some(vehicle.local_addr().unwrap()));
        assert_eq!(session.mode_table().custom_mode("GUIDED"), Some(15));
    }

    #[test]
    fn test_recv_match_skips_other_messages() {
        let mut session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let gcs = session.local_addr().unwrap();
        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        send_from(&vehicle, gcs, &heartbeat());
        send_from(
            &vehicle,
            gcs,
            &MavMessage::MISSION_ACK(MISSION_ACK_DATA {
                target_system: 255,
                target_component: 0,
                mavtype: MavMissionResult::MAV_MISSION_ACCEPTED,
                mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
                opaque_id: 0,
            }),
        );

        let received = session
            .recv_match(
                |msg| matches!(msg, MavMessage::MISSION_ACK(_)),
                Duration::from_secs(2),
            )
            .unwrap();
        assert!(matches!(received, Some((_, MavMessage::MISSION_ACK(_)))));
    }

    #[test]
    fn test_send_reaches_peer() {
        let mut session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let gcs = session.local_addr().unwrap();
        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        vehicle
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        send_from(&vehicle, gcs, &heartbeat());
        session.wait_heartbeat(Duration::from_secs(2)).unwrap();

        session.send(&heartbeat()).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let (len, _) = vehicle.recv_from(&mut buf).unwrap();
        let decoded = decode_datagram(&buf[..len]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0.system_id, 255);
    }

    #[test]
    fn test_sessions_share_an_address() {
        let first = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let port = first.local_addr().unwrap().port();

        let second = LinkSession::bind(VehicleAddress(port), &loopback());
        assert!(second.is_ok());
        assert_eq!(second.unwrap().local_addr().unwrap().port(), port);
    }

    #[test]
    fn test_recv_match_ignores_other_endpoints() {
        let mut session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        let gcs = session.local_addr().unwrap();
        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
        send_from(&vehicle, gcs, &heartbeat());
        session.wait_heartbeat(Duration::from_secs(2)).unwrap();

        let ack = MavMessage::MISSION_ACK(MISSION_ACK_DATA {
            target_system: 255,
            target_component: 0,
            mavtype: MavMissionResult::MAV_MISSION_ACCEPTED,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        });
        let is_ack = |msg: &MavMessage| matches!(msg, MavMessage::MISSION_ACK(_));

        send_from(&stranger, gcs, &ack);
        let received = session
            .recv_match(is_ack, Duration::from_millis(300))
            .unwrap();
        assert!(received.is_none());

        send_from(&vehicle, gcs, &ack);
        let received = session.recv_match(is_ack, Duration::from_secs(2)).unwrap();
        assert!(received.is_some());
    }

    #[test]
    fn test_send_without_peer_is_noop() {
        let mut session = LinkSession::bind(VehicleAddress(0), &loopback()).unwrap();
        assert!(session.send(&heartbeat()).is_ok());
    }

    #[test]
    fn test_connect_without_heartbeat_fails() {
        let result = LinkSession::connect(VehicleAddress(0), &loopback());
        assert!(matches!(result, Err(LinkError::NoHeartbeat { .. })));
    }
}
