//! # Enhanced Client Bridge
//!
//! This library lets a game server talk to enhanced clients over a plugin
//! message side channel while staying safe for vanilla clients, which must
//! never receive those messages.
//!
//! ## Core Responsibilities
//!
//! ### Capability Detection
//! Every connecting client starts out undetermined. An enhanced client
//! announces itself by registering the side channel. If it does not do so
//! within the grace period, the client is treated as vanilla for the rest of
//! its session.
//!
//! ### Deferred Delivery
//! Packets addressed to an undetermined client are queued. They are flushed
//! in order the moment the client registers, and discarded if it turns out to
//! be vanilla or disconnects first.
//!
//! ### Feature Senders
//! Typed helpers build the packets for each client feature (cooldowns,
//! holograms, nametags, server rules, staff modules, teammates, waypoints)
//! and push them through the delivery engine.
//!
//! ## Architecture Design
//!
//! ### Per-Client Locking
//! The registry keeps one lock per client, so deliveries to different
//! clients never contend. A delivery racing a registration either lands in
//! the queue before the flush or is sent directly after it; nothing is lost
//! or duplicated.
//!
//! ### Session Epochs
//! Each connection opens a new session. Grace timers carry the session they
//! were armed for, so a timer from an earlier connection cannot demote a
//! client that has since reconnected.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Capability state, pending queue and detection timer per client.
//!
//! ### Delivery Module (`delivery`)
//! The [`Bridge`](delivery::Bridge): send, queue or drop decisions, the
//! capability transitions and inbound payload handling.
//!
//! ### Session Module (`session`)
//! Turns host callbacks (connect, channel registration, world change,
//! disconnect) into bridge transitions.
//!
//! ### Network Module (`network`)
//! A UDP reference host that carries plugin messages to headless clients.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::HostConfig;
//! use server::events::LogSink;
//! use server::handler::NoopHandler;
//! use server::network::HostServer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut host = HostServer::new(
//!         HostConfig::default(),
//!         Arc::new(NoopHandler),
//!         Arc::new(LogSink),
//!     )
//!     .await?;
//!
//!     // Accepts connections, detects enhanced clients and relays
//!     // side channel traffic until shut down.
//!     host.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connections;
pub mod delivery;
pub mod detection;
pub mod events;
pub mod features;
pub mod handler;
pub mod network;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod test_support;

pub use config::{BridgeConfig, ConfigError, HostConfig};
pub use delivery::{Bridge, Delivery, PacketSink, SideChannel, TransmitError};
pub use events::{BridgeEvent, EventSink, LogSink};
pub use handler::{NoopHandler, PacketHandler};
pub use registry::{Capability, ClientId};
pub use resolver::World;
pub use session::SessionListener;
