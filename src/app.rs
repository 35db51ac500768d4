//! Application wiring
//!
//! Builds the upstream clients and the manifest store from [`Config`] and
//! owns their lifecycle. A store that fails to open is logged and left
//! out; everything that talks to the upstreams keeps working.

use crate::config::Config;
use crate::manifest::{BootstrapOutcome, Bootstrapper, CachedManifest};
use crate::remote::{BackendClient, BungieClient, TransportError};
use crate::store::{SqliteStore, StoreError};
use std::path::Path;
use std::sync::Arc;

/// Manifest bootstrapper backed by Bungie.net and SQLite
pub type ManifestBootstrapper = Bootstrapper<BungieClient, SqliteStore>;

/// Explicitly constructed application services
pub struct App {
    pub bungie: Arc<BungieClient>,
    pub backend: Arc<BackendClient>,
    store: Option<Arc<SqliteStore>>,
    bootstrapper: Option<ManifestBootstrapper>,
}

impl App {
    /// Build clients and open the manifest store
    pub fn init(config: &Config) -> Result<Self, TransportError> {
        let bungie = Arc::new(BungieClient::new(&config.bungie)?);
        let backend = Arc::new(BackendClient::new(&config.backend)?);

        let store = match SqliteStore::open(Path::new(&config.store.path), &config.store.table) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::error!(
                    path = %config.store.path,
                    error = %e,
                    "Manifest store unavailable, continuing without cache"
                );
                None
            }
        };

        let bootstrapper = store.as_ref().map(|store| {
            Bootstrapper::new(
                Arc::clone(&bungie),
                Arc::clone(store),
                config.bungie.locale.clone(),
            )
        });

        tracing::info!(
            environment = %config.bungie.environment,
            cache = store.is_some(),
            "Swampfox initialized"
        );

        Ok(Self {
            bungie,
            backend,
            store,
            bootstrapper,
        })
    }

    /// `None` when the store could not be opened
    pub fn bootstrapper(&self) -> Option<&ManifestBootstrapper> {
        self.bootstrapper.as_ref()
    }

    pub fn store(&self) -> Option<&SqliteStore> {
        self.store.as_deref()
    }

    /// Best-effort manifest caching
    ///
    /// Failures are already logged by the bootstrapper and never reach the
    /// caller; `None` means the manifest is not cached.
    pub async fn bootstrap_manifest(&self) -> Option<BootstrapOutcome> {
        let bootstrapper = self.bootstrapper.as_ref()?;
        bootstrapper.bootstrap().await.ok()
    }

    /// Cached manifest, if the store is available and holds one
    pub async fn cached_manifest(&self) -> Result<Option<CachedManifest>, StoreError> {
        match &self.bootstrapper {
            Some(bootstrapper) => bootstrapper.cached().await,
            None => Ok(None),
        }
    }

    /// Close the manifest store
    pub async fn close(&self) -> Result<(), StoreError> {
        if let Some(store) = &self.store {
            store.close().await?;
        }
        tracing::info!("Swampfox shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, StoreConfig};
    use crate::remote::test_support::spawn_upstream;
    use crate::store::BlobStore;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use tempfile::tempdir;

    fn config_with_store(path: String) -> Config {
        Config {
            store: StoreConfig {
                path,
                ..StoreConfig::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let app = App::init(&config_with_store(
            blocker.join("db.sqlite3").to_string_lossy().to_string(),
        ))
        .unwrap();

        assert!(app.store().is_none());
        assert!(app.bootstrapper().is_none());
        assert_eq!(app.bootstrap_manifest().await, None);
        assert!(app.cached_manifest().await.unwrap().is_none());
        app.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_end_to_end() {
        let router = Router::new()
            .route(
                "/Platform/Destiny2/Manifest/",
                get(|| async {
                    Json(json!({
                        "Response": {
                            "version": "test",
                            "jsonWorldContentPaths": { "en": "/common/destiny2_content/en.json" }
                        },
                        "ErrorCode": 1
                    }))
                }),
            )
            .route(
                "/bungie/common/destiny2_content/en.json",
                get(|| async {
                    Json(json!({
                        "DestinyInventoryItemDefinition": {
                            "347366834": { "displayProperties": { "name": "Ace of Spades" } }
                        }
                    }))
                }),
            );
        let base = spawn_upstream(router).await;

        let dir = tempdir().unwrap();
        let mut config =
            config_with_store(dir.path().join("db.sqlite3").to_string_lossy().to_string());
        config.bungie.base_url = base.clone();
        config.bungie.environment = Environment::Dev;
        config.bungie.proxy_origin = base;

        let app = App::init(&config).unwrap();

        let outcome = app.bootstrap_manifest().await.unwrap();
        assert!(matches!(outcome, BootstrapOutcome::Fetched { .. }));

        let again = app.bootstrap_manifest().await.unwrap();
        assert_eq!(
            again,
            BootstrapOutcome::AlreadyCached {
                record_id: outcome.record_id()
            }
        );

        let manifest = app.cached_manifest().await.unwrap().unwrap();
        assert_eq!(
            manifest
                .definition("DestinyInventoryItemDefinition", 347366834)
                .unwrap()["displayProperties"]["name"],
            "Ace of Spades"
        );

        app.close().await.unwrap();
        assert_eq!(
            app.store().unwrap().peek_first().await.unwrap_err(),
            StoreError::Closed
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_silent() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempdir().unwrap();
        let mut config =
            config_with_store(dir.path().join("db.sqlite3").to_string_lossy().to_string());
        config.bungie.base_url = format!("http://{addr}");

        let app = App::init(&config).unwrap();

        assert_eq!(app.bootstrap_manifest().await, None);
        assert_eq!(app.store().unwrap().count().await.unwrap(), 0);
    }
}
