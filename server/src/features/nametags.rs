//! Nametag overrides. Tags are listed bottom line first.

use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::Packet;

/// Shows `target` to `viewer` with the given nametag lines.
pub fn override_nametag<S, I, L>(sink: &S, viewer: ClientId, target: ClientId, tags: I) -> Delivery
where
    S: PacketSink + ?Sized,
    I: IntoIterator<Item = L>,
    L: Into<String>,
{
    sink.attempt_deliver(
        viewer,
        Packet::NametagsOverride {
            player: target,
            tags: Some(tags.into_iter().map(Into::into).collect()),
        },
    )
}

/// Undoes any override or hide for `target`.
pub fn reset_nametag<S: PacketSink + ?Sized>(sink: &S, viewer: ClientId, target: ClientId) -> Delivery {
    sink.attempt_deliver(
        viewer,
        Packet::NametagsOverride {
            player: target,
            tags: None,
        },
    )
}

pub fn hide_nametag<S: PacketSink + ?Sized>(sink: &S, viewer: ClientId, target: ClientId) -> Delivery {
    sink.attempt_deliver(
        viewer,
        Packet::NametagsOverride {
            player: target,
            tags: Some(Vec::new()),
        },
    )
}
