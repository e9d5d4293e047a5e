use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::{Packet, Waypoint};

/// Keep the waypoint if you intend to remove it later.
pub fn send_waypoint<S: PacketSink + ?Sized>(sink: &S, client: ClientId, waypoint: &Waypoint) -> Delivery {
    sink.attempt_deliver(client, Packet::WaypointAdd(waypoint.clone()))
}

pub fn remove_waypoint<S: PacketSink + ?Sized>(
    sink: &S,
    client: ClientId,
    waypoint: &Waypoint,
) -> Delivery {
    sink.attempt_deliver(
        client,
        Packet::WaypointRemove {
            name: waypoint.name.clone(),
            world: waypoint.world.clone(),
        },
    )
}
