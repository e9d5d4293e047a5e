//! Teammate markers.

use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::{Packet, TeammatePosition};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Team {
    pub leader: Option<ClientId>,
    /// How long the client keeps showing a marker without an update.
    pub last_ms: u64,
    pub players: BTreeMap<ClientId, TeammatePosition>,
}

impl Team {
    /// Returns the members the host can locate in `world`. Members that are
    /// offline or in another world are left out; `self` is untouched.
    pub fn located_in<F>(&self, world: Uuid, locate: F) -> Team
    where
        F: Fn(&ClientId) -> Option<Uuid>,
    {
        Team {
            leader: self.leader,
            last_ms: self.last_ms,
            players: self
                .players
                .iter()
                .filter(|(member, _)| locate(*member) == Some(world))
                .map(|(member, position)| (*member, *position))
                .collect(),
        }
    }

    pub fn packet(&self) -> Packet {
        Packet::Teammates {
            leader: self.leader,
            last_ms: self.last_ms,
            players: self.players.clone(),
        }
    }
}

/// Sends the part of `team` that shares the viewer's world.
pub fn send_teammates<S, F>(
    sink: &S,
    viewer: ClientId,
    viewer_world: Uuid,
    team: &Team,
    locate: F,
) -> Delivery
where
    S: PacketSink + ?Sized,
    F: Fn(&ClientId) -> Option<Uuid>,
{
    let visible = team.located_in(viewer_world, locate);
    sink.attempt_deliver(viewer, visible.packet())
}
