//! # Probe Client Library
//!
//! A headless client for exercising the host's side channel. It connects
//! over UDP, optionally announces itself as an enhanced client by
//! registering the plugin channel, and records every packet it receives.
//!
//! ## Module Organization
//!
//! ### Probe Module (`probe`)
//! Protocol state for one connection, free of any I/O:
//! - Connect and channel registration frames
//! - Decoding of side channel payloads
//! - The features the server enabled (rules, holograms, cooldowns, ...)
//! - Counting messages a vanilla client should never have seen
//!
//! ### Network Module (`network`)
//! The UDP loop around a probe session: heartbeats, delayed registration,
//! an optional world change and a bounded run time.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ProbeOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", ProbeOptions::default()).await?;
//!     client.run().await?;
//!
//!     println!("{}", client.session().summary());
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod probe;

pub use network::{Client, ProbeOptions};
pub use probe::ProbeSession;
