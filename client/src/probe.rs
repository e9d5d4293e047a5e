//! Client-side view of one connection to the host.
//!
//! [`ProbeSession`] holds no sockets. It reacts to incoming frames, keeps
//! what the server told it, and produces the frames the client should send,
//! which keeps the protocol logic testable without a network.

use log::{debug, info, warn};
use shared::{
    is_message_channel, Frame, Packet, PacketError, ServerRule, StaffModule, Waypoint,
    PROTOCOL_VERSION,
};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use uuid::Uuid;

pub struct ProbeSession {
    vanilla: bool,
    channel: String,

    client_id: Option<Uuid>,
    disconnect_reason: Option<String>,
    registered: bool,

    world: Option<String>,
    rules: BTreeMap<ServerRule, bool>,
    staff_modules: HashMap<StaffModule, bool>,
    holograms: HashMap<Uuid, Vec<String>>,
    cooldowns: HashMap<String, Duration>,
    nametags: HashMap<Uuid, Option<Vec<String>>>,
    waypoints: Vec<Waypoint>,
    teammates: usize,

    packets_received: usize,
    /// Side channel messages that arrived while they should not have.
    unexpected_messages: usize,
}

impl ProbeSession {
    /// A vanilla session never registers the side channel.
    pub fn new(vanilla: bool, channel: impl Into<String>) -> Self {
        Self {
            vanilla,
            channel: channel.into(),
            client_id: None,
            disconnect_reason: None,
            registered: false,
            world: None,
            rules: BTreeMap::new(),
            staff_modules: HashMap::new(),
            holograms: HashMap::new(),
            cooldowns: HashMap::new(),
            nametags: HashMap::new(),
            waypoints: Vec::new(),
            teammates: 0,
            packets_received: 0,
            unexpected_messages: 0,
        }
    }

    pub fn connect_frame(&self) -> Frame {
        Frame::Connect {
            client_version: PROTOCOL_VERSION,
        }
    }

    /// Frame announcing the side channel, once per connection. Vanilla
    /// sessions and sessions that are not connected yet return None.
    pub fn register_frame(&mut self) -> Option<Frame> {
        if self.vanilla || self.registered || !self.is_connected() {
            return None;
        }
        self.registered = true;
        Some(Frame::RegisterChannel {
            channel: self.channel.clone(),
        })
    }

    pub fn handle_frame(&mut self, frame: Frame) -> Result<(), PacketError> {
        match frame {
            Frame::Connected { client_id, world } => {
                info!("Connected as {} in world {}", client_id, world);
                self.client_id = Some(client_id);
                self.disconnect_reason = None;
                self.registered = false;
            }

            Frame::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.client_id = None;
                self.disconnect_reason = Some(reason);
            }

            Frame::PluginMessage { channel, payload } => {
                if !is_message_channel(&channel, &self.channel) {
                    debug!("Ignoring message on {}", channel);
                    return Ok(());
                }
                if !self.registered {
                    warn!("Received side channel message without registering");
                    self.unexpected_messages += 1;
                    return Ok(());
                }
                let packet = Packet::decode(&payload)?;
                self.apply(packet);
            }

            other => warn!("Unexpected frame from server: {:?}", other),
        }
        Ok(())
    }

    fn apply(&mut self, packet: Packet) {
        self.packets_received += 1;
        debug!("Received {} packet", packet.kind());

        match packet {
            Packet::UpdateWorld { world } => {
                info!("Now in world {}", world);
                self.world = Some(world);
            }
            Packet::ServerRule { rule, value } => {
                self.rules.insert(rule, value);
            }
            Packet::StaffModState { module, enabled } => {
                self.staff_modules.insert(module, enabled);
            }
            Packet::Hologram { id, lines, .. } | Packet::HologramUpdate { id, lines } => {
                self.holograms.insert(id, lines);
            }
            Packet::HologramRemove { id } => {
                self.holograms.remove(&id);
            }
            Packet::Cooldown {
                name, duration_ms, ..
            } => {
                if duration_ms == 0 {
                    self.cooldowns.remove(&name);
                } else {
                    self.cooldowns
                        .insert(name, Duration::from_millis(duration_ms));
                }
            }
            Packet::NametagsOverride { player, tags } => {
                self.nametags.insert(player, tags);
            }
            Packet::WaypointAdd(waypoint) => {
                self.waypoints
                    .retain(|w| !(w.name == waypoint.name && w.world == waypoint.world));
                self.waypoints.push(waypoint);
            }
            Packet::WaypointRemove { name, world } => {
                self.waypoints
                    .retain(|w| !(w.name == name && w.world == world));
            }
            Packet::Teammates { players, .. } => {
                self.teammates = players.len();
            }
            other => {
                warn!("Server sent serverbound {} packet", other.kind());
                self.unexpected_messages += 1;
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client_id.is_some()
    }

    pub fn client_id(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.as_deref()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn is_vanilla(&self) -> bool {
        self.vanilla
    }

    /// World identifier last announced over the side channel
    pub fn world(&self) -> Option<&str> {
        self.world.as_deref()
    }

    pub fn rule(&self, rule: ServerRule) -> Option<bool> {
        self.rules.get(&rule).copied()
    }

    pub fn staff_module(&self, module: StaffModule) -> Option<bool> {
        self.staff_modules.get(&module).copied()
    }

    pub fn hologram(&self, id: &Uuid) -> Option<&[String]> {
        self.holograms.get(id).map(Vec::as_slice)
    }

    pub fn cooldown(&self, name: &str) -> Option<Duration> {
        self.cooldowns.get(name).copied()
    }

    pub fn nametag(&self, player: &Uuid) -> Option<&Option<Vec<String>>> {
        self.nametags.get(player)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn teammates(&self) -> usize {
        self.teammates
    }

    pub fn packets_received(&self) -> usize {
        self.packets_received
    }

    pub fn unexpected_messages(&self) -> usize {
        self.unexpected_messages
    }

    pub fn summary(&self) -> String {
        format!(
            "{} packets received, {} unexpected, world {}, {} rules, {} holograms",
            self.packets_received,
            self.unexpected_messages,
            self.world.as_deref().unwrap_or("unknown"),
            self.rules.len(),
            self.holograms.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MESSAGE_CHANNEL;
    use tokio_test::{assert_err, assert_ok};

    fn connected(vanilla: bool) -> ProbeSession {
        let mut session = ProbeSession::new(vanilla, MESSAGE_CHANNEL);
        assert_ok!(session.handle_frame(Frame::Connected {
            client_id: Uuid::new_v4(),
            world: "world".to_string(),
        }));
        session
    }

    fn plugin_message(packet: &Packet) -> Frame {
        Frame::PluginMessage {
            channel: MESSAGE_CHANNEL.to_string(),
            payload: packet.encode().unwrap(),
        }
    }

    #[test]
    fn test_register_only_once_after_connect() {
        let mut session = ProbeSession::new(false, MESSAGE_CHANNEL);
        assert!(session.register_frame().is_none());

        let mut session = connected(false);
        assert_eq!(
            session.register_frame(),
            Some(Frame::RegisterChannel {
                channel: MESSAGE_CHANNEL.to_string()
            })
        );
        assert!(session.register_frame().is_none());
        assert!(session.is_registered());
    }

    #[test]
    fn test_vanilla_never_registers() {
        let mut session = connected(true);
        assert!(session.is_vanilla());
        assert!(session.register_frame().is_none());
    }

    #[test]
    fn test_message_before_register_is_unexpected() {
        let mut session = connected(true);
        let packet = Packet::UpdateWorld {
            world: "w".to_string(),
        };

        assert_ok!(session.handle_frame(plugin_message(&packet)));
        assert_eq!(session.unexpected_messages(), 1);
        assert_eq!(session.packets_received(), 0);
        assert_eq!(session.world(), None);
    }

    #[test]
    fn test_applies_feature_packets() {
        let mut session = connected(false);
        session.register_frame();
        let hologram = Uuid::new_v4();

        let packets = vec![
            Packet::UpdateWorld {
                world: "world_nether".to_string(),
            },
            Packet::ServerRule {
                rule: ServerRule::LegacyCombat,
                value: true,
            },
            Packet::Hologram {
                id: hologram,
                x: 0.0,
                y: 64.0,
                z: 0.0,
                lines: vec!["Hello".to_string()],
            },
            Packet::Cooldown {
                name: "pearl".to_string(),
                duration_ms: 15_000,
                icon: 368,
            },
            Packet::StaffModState {
                module: StaffModule::Xray,
                enabled: true,
            },
        ];
        for packet in &packets {
            assert_ok!(session.handle_frame(plugin_message(packet)));
        }

        assert_eq!(session.world(), Some("world_nether"));
        assert_eq!(session.rule(ServerRule::LegacyCombat), Some(true));
        assert_eq!(session.hologram(&hologram), Some(&["Hello".to_string()][..]));
        assert_eq!(session.cooldown("pearl"), Some(Duration::from_secs(15)));
        assert_eq!(session.staff_module(StaffModule::Xray), Some(true));
        assert_eq!(session.packets_received(), 5);
    }

    #[test]
    fn test_removals_and_resets() {
        let mut session = connected(false);
        session.register_frame();
        let hologram = Uuid::new_v4();

        for packet in [
            Packet::Hologram {
                id: hologram,
                x: 0.0,
                y: 0.0,
                z: 0.0,
                lines: vec![],
            },
            Packet::HologramRemove { id: hologram },
            Packet::Cooldown {
                name: "pearl".to_string(),
                duration_ms: 1000,
                icon: 368,
            },
            Packet::Cooldown {
                name: "pearl".to_string(),
                duration_ms: 0,
                icon: 368,
            },
        ] {
            assert_ok!(session.handle_frame(plugin_message(&packet)));
        }

        assert_eq!(session.hologram(&hologram), None);
        assert_eq!(session.cooldown("pearl"), None);
    }

    #[test]
    fn test_malformed_payload_is_error() {
        let mut session = connected(false);
        session.register_frame();

        assert_err!(session.handle_frame(Frame::PluginMessage {
            channel: MESSAGE_CHANNEL.to_string(),
            payload: vec![0xff, 0xff, 0xff],
        }));
    }

    #[test]
    fn test_other_channels_are_ignored() {
        let mut session = connected(false);
        assert_ok!(session.handle_frame(Frame::PluginMessage {
            channel: "minecraft:brand".to_string(),
            payload: vec![1, 2, 3],
        }));
        assert_eq!(session.unexpected_messages(), 0);
    }

    #[test]
    fn test_disconnected_frame() {
        let mut session = connected(false);
        assert_ok!(session.handle_frame(Frame::Disconnected {
            reason: "Server full".to_string(),
        }));

        assert!(!session.is_connected());
        assert_eq!(session.disconnect_reason(), Some("Server full"));
    }
}
