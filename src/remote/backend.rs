//! Stats Backend Client
//!
//! The private backend aggregates crucible stats per player, weapon and
//! collectible. Every resource is a plain GET, so they are modelled as one
//! enum rendered to a path and fetched through a single helper.

use crate::config::BackendConfig;
use crate::remote::error::TransportError;
use crate::remote::upstream::{Upstream, UpstreamConfig};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Weapon slot grouping used by the weapon type kill stats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponSlot {
    All,
    Kinetic,
    Energy,
    Power,
}

impl WeaponSlot {
    pub const ALL: [WeaponSlot; 4] = [
        WeaponSlot::All,
        WeaponSlot::Kinetic,
        WeaponSlot::Energy,
        WeaponSlot::Power,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeaponSlot::All => "all",
            WeaponSlot::Kinetic => "kinetic",
            WeaponSlot::Energy => "energy",
            WeaponSlot::Power => "power",
        }
    }
}

impl fmt::Display for WeaponSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeaponSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeaponSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown weapon slot '{}'", s))
    }
}

/// Resources served by the stats backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResource {
    /// Public demo resource
    Resource,
    /// Demo resource behind authorization
    SecureResource,
    /// Single tracked player summary
    TrackedPlayer,
    /// All tracked players
    TrackedPlayers,
    /// Clan roster with online status
    Roster,
    Player { membership_id: u64 },
    PlayerWeapons { membership_id: u64, days: u32 },
    PlayerCharacters { membership_id: u64, days: u32 },
    Weapon { weapon_id: u64 },
    WeaponKills { weapon_id: u64, days: u32 },
    WeaponTypeKills { slot: WeaponSlot, days: u32 },
    /// Kills for an item category such as "Hand Cannon"
    WeaponCategoryKills { category: String, days: u32 },
    Collectible { collectible_hash: u64 },
    Collectibles,
    CollectiblesUnowned,
}

impl BackendResource {
    /// Path relative to the backend base URL
    pub fn path(&self) -> String {
        match self {
            BackendResource::Resource => "resource/xxx".to_string(),
            BackendResource::SecureResource => "secure-resource/zzz".to_string(),
            BackendResource::TrackedPlayer => "resource/player".to_string(),
            BackendResource::TrackedPlayers => "resource/players".to_string(),
            BackendResource::Roster => "resources/roster".to_string(),
            BackendResource::Player { membership_id } => {
                format!("resources/player/{}", membership_id)
            }
            BackendResource::PlayerWeapons {
                membership_id,
                days,
            } => format!("resources/player/{}/weapons/{}", membership_id, days),
            BackendResource::PlayerCharacters {
                membership_id,
                days,
            } => format!("resources/player/{}/characters/{}", membership_id, days),
            BackendResource::Weapon { weapon_id } => format!("resources/weapon/{}", weapon_id),
            BackendResource::WeaponKills { weapon_id, days } => {
                format!("resources/weapon/{}/kills/{}", weapon_id, days)
            }
            BackendResource::WeaponTypeKills { slot, days } => {
                format!("resources/weapontypes/{}/{}", slot, days)
            }
            BackendResource::WeaponCategoryKills { category, days } => format!(
                "resources/weapons/{}/{}",
                urlencoding::encode(category),
                days
            ),
            BackendResource::Collectible { collectible_hash } => {
                format!("resources/collectible/{}", collectible_hash)
            }
            BackendResource::Collectibles => "resources/collectibles".to_string(),
            BackendResource::CollectiblesUnowned => "resources/collectibles/unowned".to_string(),
        }
    }
}

/// Client for the stats backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    upstream: Upstream,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        let upstream = Upstream::new(
            UpstreamConfig::new(
                "backend",
                config.base_url.as_str(),
                Duration::from_millis(config.timeout_ms),
            )
            .header("content-type", "application/json")
            .authorization(config.authorization.as_str()),
        )?;

        Ok(Self { upstream })
    }

    /// GET a backend resource and return the decoded body
    pub async fn fetch(&self, resource: &BackendResource) -> Result<Value, TransportError> {
        self.upstream.get_json(&resource.path()).await
    }
}
