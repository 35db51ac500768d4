//! Bungie.net API Client
//!
//! Destiny 2 endpoints on the primary upstream, plus the manifest content
//! download which goes to a separate host with a much longer timeout.

use crate::config::{BungieConfig, Environment};
use crate::remote::error::TransportError;
use crate::remote::upstream::{Upstream, UpstreamConfig};
use serde_json::Value;
use std::time::Duration;

/// Membership type used by the character endpoint
pub const PC_MEMBERSHIP_TYPE: u8 = 4;

/// Profile components requested for a player profile
const PROFILE_COMPONENTS: &str = "100,900,200,204";

/// Bungie.net API endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BungieEndpoint {
    /// Manifest descriptor
    Manifest,
    /// Player profile
    Profile {
        membership_type: u8,
        membership_id: u64,
    },
    /// Clan roster
    ClanMembers { group_id: u64 },
    /// Single character detail
    Character {
        membership_id: u64,
        character_id: u64,
    },
}

impl BungieEndpoint {
    /// Path relative to the API host
    pub fn path(&self) -> String {
        match self {
            BungieEndpoint::Manifest => "Platform/Destiny2/Manifest/".to_string(),
            BungieEndpoint::Profile {
                membership_type,
                membership_id,
            } => format!(
                "Platform/Destiny2/{}/Profile/{}/?components={}",
                membership_type, membership_id, PROFILE_COMPONENTS
            ),
            BungieEndpoint::ClanMembers { group_id } => {
                format!("Platform/GroupV2/{}/Members/", group_id)
            }
            BungieEndpoint::Character {
                membership_id,
                character_id,
            } => format!(
                "Platform/Destiny2/{}/Profile/{}/Character/{}/?components=200",
                PC_MEMBERSHIP_TYPE, membership_id, character_id
            ),
        }
    }
}

/// Maps manifest content paths to fetchable URLs for a deployment environment
#[derive(Debug, Clone)]
pub struct ContentResolver {
    environment: Environment,
    content_host: String,
    proxy_prefix: String,
    proxy_origin: String,
}

impl ContentResolver {
    pub fn from_config(config: &BungieConfig) -> Self {
        Self {
            environment: config.environment,
            content_host: config.content_host.trim_end_matches('/').to_string(),
            proxy_prefix: config.proxy_prefix.trim_end_matches('/').to_string(),
            proxy_origin: config.proxy_origin.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a content path as the deployment sees it
    ///
    /// Dev and staging go through the same-origin proxy prefix, anything
    /// else goes straight to the content host.
    pub fn resolve(&self, content_path: &str) -> String {
        let path = if content_path.starts_with('/') {
            content_path.to_string()
        } else {
            format!("/{}", content_path)
        };

        if self.environment.uses_proxy() {
            format!("{}{}", self.proxy_prefix, path)
        } else {
            format!("{}{}", self.content_host, path)
        }
    }

    /// Absolute URL for a content path
    ///
    /// Proxy-relative results are anchored at the configured proxy origin.
    pub fn absolute(&self, content_path: &str) -> String {
        let resolved = self.resolve(content_path);
        if resolved.starts_with("http://") || resolved.starts_with("https://") {
            resolved
        } else {
            format!("{}{}", self.proxy_origin, resolved)
        }
    }
}

/// Client for Bungie.net
#[derive(Debug, Clone)]
pub struct BungieClient {
    api: Upstream,
    content: Upstream,
    resolver: ContentResolver,
    content_timeout: Duration,
    clan_id: u64,
}

impl BungieClient {
    /// Create a new Bungie client with the given configuration
    pub fn new(config: &BungieConfig) -> Result<Self, TransportError> {
        let api = Upstream::new(
            UpstreamConfig::new(
                "bungie",
                config.base_url.as_str(),
                Duration::from_millis(config.timeout_ms),
            )
            .header("content-type", "application/json")
            .header("x-api-key", config.api_key.as_str())
            .authorization(config.authorization.as_str()),
        )?;

        let content_timeout = Duration::from_millis(config.content_timeout_ms);
        let content = Upstream::new(UpstreamConfig::new(
            "bungie-content",
            config.content_host.as_str(),
            content_timeout,
        ))?;

        Ok(Self {
            api,
            content,
            resolver: ContentResolver::from_config(config),
            content_timeout,
            clan_id: config.clan_id,
        })
    }

    pub fn resolver(&self) -> &ContentResolver {
        &self.resolver
    }

    /// GET any Bungie endpoint
    pub async fn get(&self, endpoint: &BungieEndpoint) -> Result<Value, TransportError> {
        self.api.get_json(&endpoint.path()).await
    }

    /// Fetch the manifest descriptor, full response envelope included
    pub async fn fetch_manifest_descriptor(&self) -> Result<Value, TransportError> {
        self.get(&BungieEndpoint::Manifest).await
    }

    /// Download manifest content referenced by a descriptor path
    pub async fn fetch_content(&self, content_path: &str) -> Result<Value, TransportError> {
        let url = self.resolver.absolute(content_path);
        tracing::info!(url = %url, "Downloading manifest content");
        self.content
            .get_json_url(&url, Some(self.content_timeout))
            .await
    }

    pub async fn fetch_profile(
        &self,
        membership_id: u64,
        membership_type: u8,
    ) -> Result<Value, TransportError> {
        self.get(&BungieEndpoint::Profile {
            membership_type,
            membership_id,
        })
        .await
    }

    /// Roster of the configured clan
    pub async fn fetch_clan_members(&self) -> Result<Value, TransportError> {
        self.get(&BungieEndpoint::ClanMembers {
            group_id: self.clan_id,
        })
        .await
    }

    pub async fn fetch_character(
        &self,
        membership_id: u64,
        character_id: u64,
    ) -> Result<Value, TransportError> {
        self.get(&BungieEndpoint::Character {
            membership_id,
            character_id,
        })
        .await
    }
}
