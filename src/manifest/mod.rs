//! Destiny 2 Manifest
//!
//! Keeps exactly one copy of the manifest content blob in the local store.
//!
//! ## Bootstrap Flow
//!
//! ```text
//! peek_first ──hit──▶ Cached
//!     │
//!    miss
//!     ▼
//! fetch descriptor ─▶ Response.jsonWorldContentPaths.<locale>
//!     ▼
//! fetch content ────▶ append ─▶ Cached
//! ```
//!
//! Any failure along the miss path leaves the store untouched and is
//! returned to the caller as a [`BootstrapError`].

mod bootstrap;
mod content;
mod descriptor;

pub use bootstrap::{BootstrapError, BootstrapOutcome, BootstrapState, Bootstrapper};
pub use content::{signed_hash, CachedManifest};
pub use descriptor::{DataShapeError, ManifestDescriptor};

use crate::remote::{BungieClient, TransportError};
use async_trait::async_trait;
use serde_json::Value;

/// Where manifest descriptors and content come from
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_manifest_descriptor(&self) -> Result<ManifestDescriptor, TransportError>;

    async fn fetch_content(&self, content_path: &str) -> Result<Value, TransportError>;
}

#[async_trait]
impl ManifestSource for BungieClient {
    async fn fetch_manifest_descriptor(&self) -> Result<ManifestDescriptor, TransportError> {
        BungieClient::fetch_manifest_descriptor(self)
            .await
            .map(ManifestDescriptor::new)
    }

    async fn fetch_content(&self, content_path: &str) -> Result<Value, TransportError> {
        BungieClient::fetch_content(self, content_path).await
    }
}
