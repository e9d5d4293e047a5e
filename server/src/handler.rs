//! Processing of packets clients send to the server.

use crate::registry::ClientId;
use shared::{Packet, PacketError, Waypoint};
use uuid::Uuid;

/// Receives decoded serverbound packets, one method per message family.
pub trait PacketHandler: Send + Sync {
    fn handle_waypoint_add(&self, client: ClientId, waypoint: Waypoint);

    fn handle_waypoint_remove(&self, client: ClientId, name: String, world: String);

    fn handle_client_voice(&self, client: ClientId, data: Vec<u8>);

    fn handle_voice_mute(&self, client: ClientId, target: Uuid);
}

/// Handler for hosts that do not process client packets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl PacketHandler for NoopHandler {
    fn handle_waypoint_add(&self, _client: ClientId, _waypoint: Waypoint) {}

    fn handle_waypoint_remove(&self, _client: ClientId, _name: String, _world: String) {}

    fn handle_client_voice(&self, _client: ClientId, _data: Vec<u8>) {}

    fn handle_voice_mute(&self, _client: ClientId, _target: Uuid) {}
}

/// Routes a serverbound packet to the matching handler method.
pub fn dispatch(
    handler: &dyn PacketHandler,
    client: ClientId,
    packet: Packet,
) -> Result<(), PacketError> {
    match packet {
        Packet::WaypointAdd(waypoint) => handler.handle_waypoint_add(client, waypoint),
        Packet::WaypointRemove { name, world } => {
            handler.handle_waypoint_remove(client, name, world)
        }
        Packet::ClientVoice { data } => handler.handle_client_voice(client, data),
        Packet::VoiceMute { target } => handler.handle_voice_mute(client, target),
        other => {
            return Err(PacketError::UnexpectedPacket { kind: other.kind() });
        }
    }
    Ok(())
}
