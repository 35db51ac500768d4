//! # Swampfox
//!
//! Destiny 2 clan stats client. Aggregates Bungie.net's public API and a
//! private stats backend, and keeps the large game manifest cached locally
//! so it is only downloaded once.
//!
//! ## Modules
//!
//! - [`remote`]: HTTP clients for both upstreams
//! - [`store`]: Append-only SQLite blob store
//! - [`manifest`]: Single-flight manifest bootstrapper and content lookups
//! - [`app`]: Wiring and lifecycle
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swampfox::{App, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let app = App::init(&config)?;
//!
//!     // Best effort: failures are logged, the app stays usable
//!     if let Some(outcome) = app.bootstrap_manifest().await {
//!         println!("Manifest cached as record {}", outcome.record_id());
//!     }
//!
//!     let roster = app.bungie.fetch_clan_members().await?;
//!     println!("{}", roster["Response"]["totalResults"]);
//!
//!     app.close().await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod manifest;
pub mod remote;
pub mod store;

pub use app::{App, ManifestBootstrapper};

pub use config::{
    BackendConfig, BungieConfig, Config, ConfigError, Environment, LoggingConfig, StoreConfig,
};

pub use manifest::{
    BootstrapError, BootstrapOutcome, BootstrapState, Bootstrapper, CachedManifest,
    DataShapeError, ManifestDescriptor, ManifestSource,
};

pub use remote::{
    BackendClient, BackendResource, BungieClient, BungieEndpoint, ContentResolver,
    TransportError, WeaponSlot,
};

pub use store::{BlobStore, CacheRecord, SqliteStore, StoreError, StoreResult};
