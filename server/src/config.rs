//! Tunables for the capability core and the reference host.

use shared::{ServerRule, DEFAULT_GRACE_PERIOD_MS, MAX_CHANNEL_LEN, MESSAGE_CHANNEL};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("side channel name must not be empty")]
    EmptyChannel,
    #[error("side channel name is {len} bytes, at most {max} allowed")]
    ChannelTooLong { len: usize, max: usize },
    #[error("grace period must be longer than zero")]
    ZeroGracePeriod,
    #[error("at least one world is required")]
    NoWorlds,
    #[error("max clients must be at least one")]
    NoCapacity,
}

/// Settings of the capability core.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Channel clients register to self-report; compared case-insensitively.
    pub channel: String,
    /// How long a connected client may stay undetermined.
    pub grace_period: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: MESSAGE_CHANNEL.to_string(),
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        }
    }
}

impl BridgeConfig {
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.trim().is_empty() {
            return Err(ConfigError::EmptyChannel);
        }
        if self.channel.len() > MAX_CHANNEL_LEN {
            return Err(ConfigError::ChannelTooLong {
                len: self.channel.len(),
                max: MAX_CHANNEL_LEN,
            });
        }
        if self.grace_period.is_zero() {
            return Err(ConfigError::ZeroGracePeriod);
        }
        Ok(())
    }
}

/// Settings of the UDP reference host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// Connections silent for longer than this are dropped.
    pub client_timeout: Duration,
    /// World names; the first one is where clients spawn.
    pub worlds: Vec<String>,
    /// Advertise world names instead of world UUIDs.
    pub named_worlds: bool,
    /// Rules switched on for every client.
    pub rules: Vec<ServerRule>,
    pub bridge: BridgeConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_clients: 32,
            client_timeout: Duration::from_secs(5),
            worlds: vec![
                "world".to_string(),
                "world_nether".to_string(),
                "world_the_end".to_string(),
            ],
            named_worlds: false,
            rules: Vec::new(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge.validate()?;
        if self.worlds.is_empty() {
            return Err(ConfigError::NoWorlds);
        }
        if self.max_clients == 0 {
            return Err(ConfigError::NoCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bridge_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.channel, MESSAGE_CHANNEL);
        assert_eq!(config.grace_period, Duration::from_secs(2));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_bridge_config_rejects_empty_channel() {
        let config = BridgeConfig {
            channel: "  ".to_string(),
            ..BridgeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyChannel));
    }

    #[test]
    fn test_bridge_config_rejects_long_channel() {
        let config = BridgeConfig {
            channel: format!("modlink:{}", "x".repeat(MAX_CHANNEL_LEN)),
            ..BridgeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ChannelTooLong {
                len: MAX_CHANNEL_LEN + 8,
                max: MAX_CHANNEL_LEN
            })
        );
    }

    #[test]
    fn test_bridge_config_rejects_zero_grace() {
        let config = BridgeConfig::default().with_grace_period(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroGracePeriod));
    }

    #[test]
    fn test_host_config_validation() {
        assert_eq!(HostConfig::default().validate(), Ok(()));

        let no_worlds = HostConfig {
            worlds: Vec::new(),
            ..HostConfig::default()
        };
        assert_eq!(no_worlds.validate(), Err(ConfigError::NoWorlds));

        let no_capacity = HostConfig {
            max_clients: 0,
            ..HostConfig::default()
        };
        assert_eq!(no_capacity.validate(), Err(ConfigError::NoCapacity));
    }
}
