//! Notifications published by the bridge for observers and auditing.

use crate::registry::ClientId;
use log::debug;
use shared::Packet;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The client's self-report was accepted.
    ClientRegistered { client: ClientId },
    /// The client unregistered the channel while still connected.
    ClientUnregistered { client: ClientId },
    PacketSent { client: ClientId, packet: Packet },
    PacketQueued { client: ClientId, kind: &'static str },
    PacketDropped { client: ClientId, kind: &'static str },
    PacketReceived { client: ClientId, packet: Packet },
}

/// Receives bridge notifications synchronously, from whichever thread
/// caused them. Events are published after the client's lock is released,
/// so a sink may call back into the bridge.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: BridgeEvent);
}

/// Logs every event at debug level and otherwise ignores it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: BridgeEvent) {
        debug!("bridge event: {:?}", event);
    }
}

/// Forwards events to an async consumer. Events are dropped once the
/// receiver is gone.
impl EventSink for mpsc::UnboundedSender<BridgeEvent> {
    fn publish(&self, event: BridgeEvent) {
        let _ = self.send(event);
    }
}
