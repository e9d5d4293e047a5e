//! Value objects embedded in packets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client-side staff tools the server can toggle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaffModule {
    Xray,
    NameTags,
    Bunnyhop,
}

impl StaffModule {
    pub const ALL: [StaffModule; 3] = [
        StaffModule::Xray,
        StaffModule::NameTags,
        StaffModule::Bunnyhop,
    ];
}

/// Boolean server rules understood by enhanced clients.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServerRule {
    VoiceEnabled,
    ServerHandlesWaypoints,
    CompetitiveGame,
    ShadersDisabled,
    LegacyEnchanting,
    LegacyCombat,
}

impl ServerRule {
    pub const ALL: [ServerRule; 6] = [
        ServerRule::VoiceEnabled,
        ServerRule::ServerHandlesWaypoints,
        ServerRule::CompetitiveGame,
        ServerRule::ShadersDisabled,
        ServerRule::LegacyEnchanting,
        ServerRule::LegacyCombat,
    ];

    /// Key the client uses to look the rule up.
    pub fn key(&self) -> &'static str {
        match self {
            ServerRule::VoiceEnabled => "voiceEnabled",
            ServerRule::ServerHandlesWaypoints => "serverHandlesWaypoints",
            ServerRule::CompetitiveGame => "competitiveGame",
            ServerRule::ShadersDisabled => "shadersDisabled",
            ServerRule::LegacyEnchanting => "legacyEnchanting",
            ServerRule::LegacyCombat => "legacyCombat",
        }
    }
}

impl fmt::Display for ServerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ServerRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServerRule::ALL
            .iter()
            .copied()
            .find(|rule| rule.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown server rule '{}'", s))
    }
}

/// A named marker in a world. `world` is the resolved world identifier,
/// not the display name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub world: String,
    /// Packed 0xRRGGBB colour.
    pub color: u32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub forced: bool,
    pub visible: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct TeammatePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
