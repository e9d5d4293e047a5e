//! Typed payloads carried on the side channel.

use crate::objects::{ServerRule, StaffModule, TeammatePosition, Waypoint};
use crate::{check_size, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode packet: {0}")]
    Decode(#[source] bincode::Error),
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
    #[error("{kind} packets are not accepted from clients")]
    UnexpectedPacket { kind: &'static str },
}

/// Which side may originate a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clientbound,
    Serverbound,
    Both,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Cooldown {
        name: String,
        duration_ms: u64,
        icon: u32,
    },
    Hologram {
        id: Uuid,
        x: f64,
        y: f64,
        z: f64,
        lines: Vec<String>,
    },
    HologramUpdate {
        id: Uuid,
        lines: Vec<String>,
    },
    HologramRemove {
        id: Uuid,
    },
    /// `None` restores the vanilla nametag, an empty list hides it.
    NametagsOverride {
        player: Uuid,
        tags: Option<Vec<String>>,
    },
    StaffModState {
        module: StaffModule,
        enabled: bool,
    },
    ServerRule {
        rule: ServerRule,
        value: bool,
    },
    Teammates {
        leader: Option<Uuid>,
        last_ms: u64,
        players: BTreeMap<Uuid, TeammatePosition>,
    },
    UpdateWorld {
        world: String,
    },

    WaypointAdd(Waypoint),
    WaypointRemove {
        name: String,
        world: String,
    },

    ClientVoice {
        data: Vec<u8>,
    },
    VoiceMute {
        target: Uuid,
    },
}

impl Packet {
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Cooldown { .. } => "cooldown",
            Packet::Hologram { .. } => "hologram",
            Packet::HologramUpdate { .. } => "hologram_update",
            Packet::HologramRemove { .. } => "hologram_remove",
            Packet::NametagsOverride { .. } => "nametags_override",
            Packet::StaffModState { .. } => "staff_mod_state",
            Packet::ServerRule { .. } => "server_rule",
            Packet::Teammates { .. } => "teammates",
            Packet::UpdateWorld { .. } => "update_world",
            Packet::WaypointAdd(_) => "waypoint_add",
            Packet::WaypointRemove { .. } => "waypoint_remove",
            Packet::ClientVoice { .. } => "client_voice",
            Packet::VoiceMute { .. } => "voice_mute",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Packet::WaypointAdd(_) | Packet::WaypointRemove { .. } => Direction::Both,
            Packet::ClientVoice { .. } | Packet::VoiceMute { .. } => Direction::Serverbound,
            _ => Direction::Clientbound,
        }
    }

    /// Encodes the packet. Packets too large to travel inside a single
    /// plugin message are rejected with [`PacketError::TooLarge`].
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let bytes = bincode::serialize(self).map_err(PacketError::Encode)?;
        check_size(bytes.len(), MAX_PAYLOAD_SIZE)?;
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        check_size(bytes.len(), MAX_PACKET_SIZE)?;
        bincode::deserialize(bytes).map_err(PacketError::Decode)
    }

    /// Decodes a payload sent by a client, rejecting packets only the
    /// server may originate.
    pub fn decode_serverbound(bytes: &[u8]) -> Result<Self, PacketError> {
        let packet = Self::decode(bytes)?;
        match packet.direction() {
            Direction::Clientbound => Err(PacketError::UnexpectedPacket {
                kind: packet.kind(),
            }),
            Direction::Serverbound | Direction::Both => Ok(packet),
        }
    }
}
