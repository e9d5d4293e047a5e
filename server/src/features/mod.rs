//! Convenience senders for individual client features.
//!
//! Each sender only builds packets and hands them to a [`PacketSink`];
//! none of them know about capability or queueing.
//!
//! [`PacketSink`]: crate::delivery::PacketSink

pub mod cooldown;
pub mod holograms;
pub mod nametags;
pub mod rules;
pub mod staff;
pub mod teammates;
pub mod waypoints;

pub use cooldown::{Cooldown, CooldownError};
pub use rules::ServerRules;
pub use teammates::Team;
