use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::Packet;
use uuid::Uuid;

/// Places a hologram for one viewer. Keep `id` around to update or remove it.
pub fn add_hologram<S, I, L>(
    sink: &S,
    viewer: ClientId,
    id: Uuid,
    position: [f64; 3],
    lines: I,
) -> Delivery
where
    S: PacketSink + ?Sized,
    I: IntoIterator<Item = L>,
    L: Into<String>,
{
    let [x, y, z] = position;
    sink.attempt_deliver(
        viewer,
        Packet::Hologram {
            id,
            x,
            y,
            z,
            lines: lines.into_iter().map(Into::into).collect(),
        },
    )
}

pub fn update_hologram<S, I, L>(sink: &S, viewer: ClientId, id: Uuid, lines: I) -> Delivery
where
    S: PacketSink + ?Sized,
    I: IntoIterator<Item = L>,
    L: Into<String>,
{
    sink.attempt_deliver(
        viewer,
        Packet::HologramUpdate {
            id,
            lines: lines.into_iter().map(Into::into).collect(),
        },
    )
}

pub fn remove_hologram<S: PacketSink + ?Sized>(sink: &S, viewer: ClientId, id: Uuid) -> Delivery {
    sink.attempt_deliver(viewer, Packet::HologramRemove { id })
}
