//! Ack correlator
//!
//! Waits (bounded) for the next vehicle message whose kind is in an
//! acceptable set, optionally correlated to a specific command id, and turns
//! it into a decorated `AckMessage`.
//!
//! A timeout is a normal outcome and yields `Ok(None)`; only link failures are
//! errors.

use std::time::Duration;

use mavlink::common::{MavCmd, MavMessage};

use super::ack::{AckMessage, MessageKind};
use super::broadcast::BroadcastSink;
use super::session::LinkSession;
use crate::config::DEFAULT_TIMEOUT;
use crate::error::LinkError;
use crate::types::VehicleAddress;

/// What to wait for and how to decorate it.
pub struct AckRequest<'a> {
    kinds: &'a [MessageKind],
    command: Option<MavCmd>,
    timeout: Duration,
    label: Option<&'a str>,
    sink: Option<&'a dyn BroadcastSink>,
}

impl<'a> AckRequest<'a> {
    /// Wait for any of `kinds` for the default 6 s.
    pub fn new(kinds: &'a [MessageKind]) -> Self {
        Self {
            kinds,
            command: None,
            timeout: DEFAULT_TIMEOUT,
            label: None,
            sink: None,
        }
    }

    /// Only accept COMMAND_ACKs whose embedded command id is `command`.
    pub fn correlated_to(mut self, command: MavCmd) -> Self {
        self.command = Some(command);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set `command` on the decorated message to `label`.
    pub fn labelled(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Publish the decorated message to `sink`.
    pub fn published(mut self, sink: &'a dyn BroadcastSink) -> Self {
        self.sink = Some(sink);
        self
    }

    fn accepts(&self, msg: &MavMessage) -> bool {
        let Some(kind) = MessageKind::of(msg) else {
            return false;
        };
        if !self.kinds.contains(&kind) {
            return false;
        }
        match (self.command, msg) {
            (Some(command), MavMessage::COMMAND_ACK(ack)) => ack.command == command,
            _ => true,
        }
    }
}

/// Wait for the response described by `request`.
pub fn await_ack(
    session: &mut LinkSession,
    address: VehicleAddress,
    request: &AckRequest<'_>,
) -> Result<Option<AckMessage>, LinkError> {
    let received = session.recv_match(|msg| request.accepts(msg), request.timeout)?;
    let Some((_, msg)) = received else {
        crate::log_debug!(
            "No {:?} from {} within {:?}",
            request.kinds,
            address,
            request.timeout
        );
        return Ok(None);
    };

    let mut ack = AckMessage::from_message(&msg);
    ack.decorate(address, request.label);
    crate::log_debug!("Ack from {}: {}", address, ack);

    if let Some(sink) = request.sink {
        match serde_json::to_string(&ack) {
            Ok(payload) => sink.publish(&payload),
            Err(e) => crate::log_warn!("Could not serialize ack for broadcast: {}", e),
        }
    }

    Ok(Some(ack))
}
