//! Wire protocol shared by the host server and enhanced clients.
//!
//! Two layers live here:
//! - [`Frame`]: the host transport envelope (connect, channel registration,
//!   plugin messages, world changes, heartbeats, disconnects)
//! - [`Packet`]: the typed payloads carried inside a plugin message on the
//!   [`MESSAGE_CHANNEL`]

pub mod objects;
pub mod packets;

pub use objects::{ServerRule, StaffModule, TeammatePosition, Waypoint};
pub use packets::{Direction, Packet, PacketError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plugin channel enhanced clients register to announce themselves.
pub const MESSAGE_CHANNEL: &str = "modlink:pm";

/// Milliseconds a client has to register the channel after connecting.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2000;

/// Largest datagram either side will read or decode.
pub const MAX_PACKET_SIZE: usize = 2048;

/// Longest side channel name a host may be configured with.
pub const MAX_CHANNEL_LEN: usize = 32;

/// Largest encoded packet. The rest of a datagram is reserved for the
/// plugin message envelope and its channel name.
pub const MAX_PAYLOAD_SIZE: usize = MAX_PACKET_SIZE - 64;

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Frame {
    Connect {
        client_version: u32,
    },
    RegisterChannel {
        channel: String,
    },
    UnregisterChannel {
        channel: String,
    },
    PluginMessage {
        channel: String,
        payload: Vec<u8>,
    },
    ChangeWorld {
        world: String,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: Uuid,
        world: String,
    },
    Disconnected {
        reason: String,
    },
}

impl Frame {
    /// Encodes the frame, refusing anything that would not fit the
    /// receiver's datagram buffer.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let bytes = bincode::serialize(self).map_err(PacketError::Encode)?;
        check_size(bytes.len(), MAX_PACKET_SIZE)?;
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        check_size(bytes.len(), MAX_PACKET_SIZE)?;
        bincode::deserialize(bytes).map_err(PacketError::Decode)
    }
}

pub(crate) fn check_size(len: usize, max: usize) -> Result<(), PacketError> {
    if len > max {
        return Err(PacketError::TooLarge { len, max });
    }
    Ok(())
}

/// Case-insensitive match against the side channel name, the way hosts
/// report channel registrations.
pub fn is_message_channel(channel: &str, expected: &str) -> bool {
    channel.eq_ignore_ascii_case(expected)
}
