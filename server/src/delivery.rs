//! The delivery decision engine and the capability transitions around it.
//!
//! [`Bridge`] is the one object every collaborator shares: the host's
//! session listener drives its transitions, feature senders push packets
//! through [`Bridge::attempt_deliver`], and the side channel feeds inbound
//! payloads to [`Bridge::receive`].
//!
//! Transmission happens while the client's slot is locked. That is what
//! keeps a flush on promotion ahead of any packet sent right after it, so
//! the [`SideChannel`] must hand bytes off without blocking.

use crate::config::{BridgeConfig, ConfigError};
use crate::detection::DetectionTimer;
use crate::events::{BridgeEvent, EventSink};
use crate::handler::{dispatch, PacketHandler};
use crate::registry::{
    Admission, Capability, CapabilityRegistry, ClientId, Demotion, Promotion,
};
use crate::resolver::{World, WorldResolver};
use log::{debug, error, info, warn};
use shared::{Packet, PacketError};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Outcome of one delivery attempt. All three are normal completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Queued,
    Dropped,
}

#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("client {0} has no open connection")]
    NotConnected(ClientId),
    #[error("side channel closed")]
    Closed,
}

/// Outbound half of the side channel.
pub trait SideChannel: Send + Sync {
    /// Hands an encoded payload to the transport. Must not block.
    fn transmit(&self, client: ClientId, channel: &str, payload: Vec<u8>)
        -> Result<(), TransmitError>;
}

/// The contract feature senders are written against.
pub trait PacketSink {
    fn attempt_deliver(&self, client: ClientId, packet: Packet) -> Delivery;
}

impl<S: PacketSink + ?Sized> PacketSink for Arc<S> {
    fn attempt_deliver(&self, client: ClientId, packet: Packet) -> Delivery {
        (**self).attempt_deliver(client, packet)
    }
}

pub struct Bridge {
    config: BridgeConfig,
    registry: CapabilityRegistry,
    worlds: WorldResolver,
    detection: DetectionTimer,
    channel: Arc<dyn SideChannel>,
    handler: Arc<dyn PacketHandler>,
    events: Arc<dyn EventSink>,
}

impl Bridge {
    /// Builds a bridge around `config`, rejecting settings that would leave
    /// it unable to detect or reach any client.
    pub fn new(
        config: BridgeConfig,
        channel: Arc<dyn SideChannel>,
        handler: Arc<dyn PacketHandler>,
        events: Arc<dyn EventSink>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let detection = DetectionTimer::new(config.grace_period);
        Ok(Arc::new(Self {
            config,
            registry: CapabilityRegistry::new(),
            worlds: WorldResolver::new(),
            detection,
            channel,
            handler,
            events,
        }))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Starts a session for `client` and arms its detection timer. Must be
    /// called from within a Tokio runtime.
    pub fn connect(self: &Arc<Self>, client: ClientId) {
        let session = self.registry.open(client);
        let timer = self.detection.arm(Arc::downgrade(self), client, session);

        // If the session closed in between, the timer finds no slot and does nothing.
        let armed = self
            .registry
            .with_session(&client, session, |slot| slot.set_detection(timer));
        if armed.is_some() {
            debug!(
                "Client {} connected, waiting {:?} for {}",
                client, self.config.grace_period, self.config.channel
            );
        }
    }

    /// Accepts a self-report. Returns true only for the transition into
    /// `Capable`; repeated reports and reports from incapable clients are
    /// ignored.
    pub fn mark_capable(&self, client: ClientId) -> bool {
        let promotion = self.registry.with_slot(&client, |slot| match slot.promote() {
            Promotion::Promoted(pending) => {
                let (sent, failed): (Vec<Packet>, Vec<Packet>) = pending
                    .into_iter()
                    .partition(|packet| self.transmit(client, packet));
                (Promotion::Promoted(sent), failed)
            }
            other => (other, Vec::new()),
        });

        match promotion {
            Some((Promotion::Promoted(sent), failed)) => {
                info!(
                    "Client {} registered {}, flushed {} queued packets",
                    client,
                    self.config.channel,
                    sent.len()
                );
                if !failed.is_empty() {
                    warn!(
                        "Dropped {} queued packets for {} during flush",
                        failed.len(),
                        client
                    );
                }
                for packet in sent {
                    self.events.publish(BridgeEvent::PacketSent { client, packet });
                }
                for packet in failed {
                    self.events.publish(BridgeEvent::PacketDropped {
                        client,
                        kind: packet.kind(),
                    });
                }
                self.events.publish(BridgeEvent::ClientRegistered { client });
                true
            }
            Some((Promotion::AlreadyCapable, _)) => {
                debug!("Client {} is already registered", client);
                false
            }
            Some((Promotion::Rejected, _)) => {
                debug!("Ignoring late registration from incapable client {}", client);
                false
            }
            None => {
                debug!("Ignoring registration from untracked client {}", client);
                false
            }
        }
    }

    /// Moves a client to `Incapable` and drops anything queued for it.
    pub fn mark_incapable(&self, client: ClientId) -> bool {
        self.demote(client).is_some()
    }

    /// Handles the client unregistering the channel while still connected.
    pub fn unregister(&self, client: ClientId) -> bool {
        if self.demote(client).is_some() {
            self.events.publish(BridgeEvent::ClientUnregistered { client });
            true
        } else {
            false
        }
    }

    /// Releases everything held for a disconnected client.
    pub fn forget(&self, client: ClientId) -> bool {
        match self.registry.close(&client) {
            Some(discarded) => {
                debug!(
                    "Client {} disconnected, discarded {} queued packets",
                    client, discarded
                );
                true
            }
            None => false,
        }
    }

    /// Called by the detection timer once the grace window of `session`
    /// ends.
    pub(crate) fn expire_grace(&self, client: ClientId, session: u64) -> bool {
        let demotion = self
            .registry
            .with_session(&client, session, |slot| {
                (slot.state() == Capability::Undetermined).then(|| slot.demote())
            })
            .flatten();

        match demotion {
            Some(Demotion::Demoted { discarded }) => {
                info!(
                    "Client {} did not register {} within {:?}, discarded {} queued packets",
                    client, self.config.channel, self.config.grace_period, discarded
                );
                true
            }
            _ => false,
        }
    }

    pub fn query(&self, client: &ClientId) -> Capability {
        self.registry.query(client)
    }

    pub fn is_capable(&self, client: &ClientId) -> bool {
        self.query(client) == Capability::Capable
    }

    pub fn capable_clients(&self) -> Vec<ClientId> {
        self.registry.clients_in(Capability::Capable)
    }

    /// Sends, queues or drops `packet` depending on what is known about
    /// the client. Untracked clients are treated as incapable.
    pub fn attempt_deliver(&self, client: ClientId, packet: Packet) -> Delivery {
        let kind = packet.kind();
        let outcome = self.registry.with_slot(&client, |slot| match slot.admit(packet) {
            Admission::Transmit(packet) if self.transmit(client, &packet) => {
                (Delivery::Sent, Some(packet))
            }
            Admission::Transmit(_) | Admission::Dropped(_) => (Delivery::Dropped, None),
            Admission::Queued => (Delivery::Queued, None),
        });

        match outcome {
            Some((Delivery::Sent, Some(packet))) => {
                debug!("Sent {} packet to {}", kind, client);
                self.events.publish(BridgeEvent::PacketSent { client, packet });
                Delivery::Sent
            }
            Some((Delivery::Queued, _)) => {
                debug!("Queued {} packet for undetermined client {}", kind, client);
                self.events.publish(BridgeEvent::PacketQueued { client, kind });
                Delivery::Queued
            }
            _ => {
                debug!("Dropped {} packet for {}", kind, client);
                self.events.publish(BridgeEvent::PacketDropped { client, kind });
                Delivery::Dropped
            }
        }
    }

    /// Decodes a payload a client sent on the side channel and hands it to
    /// the packet handler. Malformed payloads are rejected without touching
    /// any state.
    pub fn receive(&self, client: ClientId, payload: &[u8]) -> Result<(), PacketError> {
        let packet = Packet::decode_serverbound(payload).map_err(|e| {
            warn!("Rejected payload from {}: {}", client, e);
            e
        })?;

        self.events.publish(BridgeEvent::PacketReceived {
            client,
            packet: packet.clone(),
        });
        dispatch(self.handler.as_ref(), client, packet)
    }

    pub fn resolve_world(&self, world: &World) -> String {
        self.worlds.resolve(world)
    }

    pub fn register_world_identifier<F>(&self, world: Uuid, identifier: F)
    where
        F: Fn(&World) -> String + Send + Sync + 'static,
    {
        self.worlds.register(world, identifier);
    }

    fn demote(&self, client: ClientId) -> Option<usize> {
        let demotion = self.registry.with_slot(&client, |slot| slot.demote())?;
        match demotion {
            Demotion::Demoted { discarded } => {
                info!(
                    "Client {} is not running an enhanced client, discarded {} queued packets",
                    client, discarded
                );
                Some(discarded)
            }
            Demotion::AlreadyIncapable => None,
        }
    }

    fn transmit(&self, client: ClientId, packet: &Packet) -> bool {
        let payload = match packet.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode {} packet for {}: {}", packet.kind(), client, e);
                return false;
            }
        };

        match self.channel.transmit(client, &self.config.channel, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to transmit {} packet to {}: {}", packet.kind(), client, e);
                false
            }
        }
    }
}

impl PacketSink for Bridge {
    fn attempt_deliver(&self, client: ClientId, packet: Packet) -> Delivery {
        Bridge::attempt_deliver(self, client, packet)
    }
}
