//! Broadcast sink for live UI updates
//!
//! Decorated acks are published as JSON text, fire-and-forget. A sink must
//! never block the handshake that publishes into it, and its failures are its
//! own concern.

use tokio::sync::broadcast;

/// Receiver of published ack payloads.
pub trait BroadcastSink: Send + Sync {
    /// Hand one JSON payload to listeners. Must not block.
    fn publish(&self, payload: &str);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl BroadcastSink for NullSink {
    fn publish(&self, _payload: &str) {}
}

impl<F> BroadcastSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn publish(&self, payload: &str) {
        self(payload)
    }
}

/// Sink backed by a tokio broadcast channel.
///
/// Each subscriber sees every payload published after it subscribed; lagging
/// subscribers lose the oldest payloads.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: broadcast::Sender<String>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl BroadcastSink for ChannelSink {
    fn publish(&self, payload: &str) {
        if self.sender.send(payload.to_owned()).is_err() {
            crate::log_trace!("No broadcast listeners, payload dropped");
        }
    }
}
