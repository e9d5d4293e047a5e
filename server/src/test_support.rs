use crate::config::BridgeConfig;
use crate::delivery::{Bridge, Delivery, PacketSink, SideChannel, TransmitError};
use crate::events::BridgeEvent;
use crate::handler::NoopHandler;
use crate::registry::ClientId;
use parking_lot::Mutex;
use shared::Packet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Side channel that keeps every transmitted frame.
#[derive(Default)]
pub struct RecordingChannel {
    frames: Mutex<Vec<(ClientId, String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    pub fn frames(&self) -> Vec<(ClientId, String, Vec<u8>)> {
        self.frames.lock().clone()
    }

    pub fn packets_for(&self, client: ClientId) -> Vec<Packet> {
        self.frames
            .lock()
            .iter()
            .filter(|(id, _, _)| *id == client)
            .map(|(_, _, payload)| Packet::decode(payload).unwrap())
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SideChannel for RecordingChannel {
    fn transmit(
        &self,
        client: ClientId,
        channel: &str,
        payload: Vec<u8>,
    ) -> Result<(), TransmitError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransmitError::Closed);
        }
        self.frames
            .lock()
            .push((client, channel.to_string(), payload));
        Ok(())
    }
}

/// Packet sink that accepts everything, for feature sender tests.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(ClientId, Packet)>>,
}

impl RecordingSink {
    pub fn packets(&self) -> Vec<(ClientId, Packet)> {
        self.delivered.lock().clone()
    }
}

impl PacketSink for RecordingSink {
    fn attempt_deliver(&self, client: ClientId, packet: Packet) -> Delivery {
        self.delivered.lock().push((client, packet));
        Delivery::Sent
    }
}

pub fn bridge_with(
    grace_period: Duration,
) -> (
    Arc<Bridge>,
    Arc<RecordingChannel>,
    mpsc::UnboundedReceiver<BridgeEvent>,
) {
    let channel = Arc::new(RecordingChannel::default());
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let bridge = Bridge::new(
        BridgeConfig::default().with_grace_period(grace_period),
        channel.clone(),
        Arc::new(NoopHandler),
        Arc::new(events_tx),
    )
    .unwrap();
    (bridge, channel, events_rx)
}
