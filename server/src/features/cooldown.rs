//! Cooldown timers shown next to the client's hotbar.

use crate::delivery::{Delivery, PacketSink};
use crate::registry::ClientId;
use shared::Packet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CooldownError {
    #[error("cooldown name must not be empty")]
    EmptyName,
    #[error("cooldown duration must be longer than zero")]
    ZeroDuration,
}

/// A reusable cooldown that can be sent to many clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooldown {
    name: String,
    duration: Duration,
    icon: u32,
}

impl Cooldown {
    /// `icon` is the item id shown as the cooldown's icon.
    pub fn new(name: impl Into<String>, duration: Duration, icon: u32) -> Result<Self, CooldownError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CooldownError::EmptyName);
        }
        if duration.as_millis() == 0 {
            return Err(CooldownError::ZeroDuration);
        }
        Ok(Self {
            name,
            duration,
            icon,
        })
    }

    pub fn from_millis(name: impl Into<String>, millis: u64, icon: u32) -> Result<Self, CooldownError> {
        Self::new(name, Duration::from_millis(millis), icon)
    }

    pub fn from_secs(name: impl Into<String>, secs: u64, icon: u32) -> Result<Self, CooldownError> {
        Self::new(name, Duration::from_secs(secs), icon)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn icon(&self) -> u32 {
        self.icon
    }

    pub fn packet(&self) -> Packet {
        self.packet_with(self.duration.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn send<S: PacketSink + ?Sized>(&self, sink: &S, client: ClientId) -> Delivery {
        sink.attempt_deliver(client, self.packet())
    }

    /// Ends the cooldown on the client before it runs out.
    pub fn clear<S: PacketSink + ?Sized>(&self, sink: &S, client: ClientId) -> Delivery {
        sink.attempt_deliver(client, self.packet_with(0))
    }

    fn packet_with(&self, duration_ms: u64) -> Packet {
        Packet::Cooldown {
            name: self.name.clone(),
            duration_ms,
            icon: self.icon,
        }
    }
}
