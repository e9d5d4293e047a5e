//! Translates host session events into bridge transitions.

use crate::delivery::{Bridge, Delivery};
use crate::registry::ClientId;
use crate::resolver::World;
use log::debug;
use shared::{is_message_channel, Packet};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionListener {
    bridge: Arc<Bridge>,
}

impl SessionListener {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    pub fn on_connect(&self, client: ClientId) {
        self.bridge.connect(client);
    }

    /// A client registered a plugin channel. Only the side channel counts as
    /// a self-report; after it the client is told which world it is in.
    pub fn on_channel_register(&self, client: ClientId, channel: &str, world: &World) -> bool {
        if !is_message_channel(channel, &self.bridge.config().channel) {
            debug!("Client {} registered unrelated channel {}", client, channel);
            return false;
        }

        let registered = self.bridge.mark_capable(client);
        self.send_world(client, world);
        registered
    }

    pub fn on_channel_unregister(&self, client: ClientId, channel: &str) -> bool {
        if !is_message_channel(channel, &self.bridge.config().channel) {
            return false;
        }
        self.bridge.unregister(client)
    }

    pub fn on_disconnect(&self, client: ClientId) {
        self.bridge.forget(client);
    }

    pub fn on_world_changed(&self, client: ClientId, world: &World) -> Delivery {
        self.send_world(client, world)
    }

    fn send_world(&self, client: ClientId, world: &World) -> Delivery {
        let world = self.bridge.resolve_world(world);
        self.bridge
            .attempt_deliver(client, Packet::UpdateWorld { world })
    }
}
