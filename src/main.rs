//! Swampfox CLI
//!
//! Command-line access to the clan stats upstreams and the manifest cache:
//! - Cache the manifest
//! - Inspect the cache and look up definitions
//! - Query Bungie profiles, roster and characters
//! - Query backend stats

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use swampfox::config::generate_default_config;
use swampfox::manifest::signed_hash;
use swampfox::{App, BackendResource, Config, LoggingConfig, WeaponSlot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "swampfox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Destiny 2 clan stats client with a locally cached manifest")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and cache the manifest if it is not cached yet
    Bootstrap,

    /// Show manifest cache status
    Status,

    /// Look up a definition in the cached manifest
    Lookup {
        /// Definition table, e.g. DestinyInventoryItemDefinition
        table: String,
        /// Definition hash
        hash: u32,
    },

    /// Fetch a player profile
    Profile {
        membership_id: u64,
        /// 1 = Xbox, 2 = PSN, 3 = Steam, ...
        #[arg(short = 't', long, default_value = "3")]
        membership_type: u8,
    },

    /// Fetch the clan roster
    Roster,

    /// Fetch a single character
    Character { membership_id: u64, character_id: u64 },

    /// Query the stats backend
    Stats {
        #[command(subcommand)]
        resource: StatsCommand,
    },

    /// Print a default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum StatsCommand {
    /// Public sample resource
    Resource,
    /// Resource behind the backend's auth check
    SecureResource,
    /// The backend's tracked-player resource
    TrackedPlayer,
    /// Clan roster with online status
    Roster,
    /// All tracked players
    Players,
    /// One player's summary
    Player { membership_id: u64 },
    /// Kills per weapon for a player
    PlayerWeapons {
        membership_id: u64,
        #[arg(default_value = "1")]
        days: u32,
    },
    /// Kills per character for a player
    PlayerCharacters {
        membership_id: u64,
        #[arg(default_value = "1")]
        days: u32,
    },
    /// Weapon summary
    Weapon { weapon_id: u64 },
    /// Kills with one weapon
    WeaponKills {
        weapon_id: u64,
        #[arg(default_value = "1")]
        days: u32,
    },
    /// Kills by weapon slot (all, kinetic, energy, power)
    WeaponTypes {
        slot: WeaponSlot,
        #[arg(default_value = "1")]
        days: u32,
    },
    /// Kills by item category, e.g. "Hand Cannon"
    WeaponCategory {
        category: String,
        #[arg(default_value = "1")]
        days: u32,
    },
    /// One collectible
    Collectible { collectible_hash: u64 },
    /// Owned collectibles
    Collectibles {
        /// Show unowned collectibles instead
        #[arg(long)]
        unowned: bool,
    },
}

impl From<StatsCommand> for BackendResource {
    fn from(command: StatsCommand) -> Self {
        match command {
            StatsCommand::Resource => BackendResource::Resource,
            StatsCommand::SecureResource => BackendResource::SecureResource,
            StatsCommand::TrackedPlayer => BackendResource::TrackedPlayer,
            StatsCommand::Roster => BackendResource::Roster,
            StatsCommand::Players => BackendResource::TrackedPlayers,
            StatsCommand::Player { membership_id } => BackendResource::Player { membership_id },
            StatsCommand::PlayerWeapons {
                membership_id,
                days,
            } => BackendResource::PlayerWeapons {
                membership_id,
                days,
            },
            StatsCommand::PlayerCharacters {
                membership_id,
                days,
            } => BackendResource::PlayerCharacters {
                membership_id,
                days,
            },
            StatsCommand::Weapon { weapon_id } => BackendResource::Weapon { weapon_id },
            StatsCommand::WeaponKills { weapon_id, days } => {
                BackendResource::WeaponKills { weapon_id, days }
            }
            StatsCommand::WeaponTypes { slot, days } => {
                BackendResource::WeaponTypeKills { slot, days }
            }
            StatsCommand::WeaponCategory { category, days } => {
                BackendResource::WeaponCategoryKills { category, days }
            }
            StatsCommand::Collectible { collectible_hash } => {
                BackendResource::Collectible { collectible_hash }
            }
            StatsCommand::Collectibles { unowned: false } => BackendResource::Collectibles,
            StatsCommand::Collectibles { unowned: true } => BackendResource::CollectiblesUnowned,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // No config or upstreams needed to print the template
    if let Commands::Config { output } = &cli.command {
        return write_config(output.as_deref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::discover()?,
    };
    init_logging(&config.logging);
    tracing::debug!(environment = %config.bungie.environment, "Config loaded");

    let app = App::init(&config)?;
    let result = run(&app, cli.command).await;
    app.close().await?;
    result
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Bootstrap => {
            let bootstrapper = app
                .bootstrapper()
                .context("Manifest store is unavailable")?;
            let outcome = bootstrapper.bootstrap().await?;
            print_json(&json!({
                "record_id": outcome.record_id(),
                "outcome": format!("{:?}", outcome),
            }));
        }

        Commands::Status => {
            let store = app.store().context("Manifest store is unavailable")?;
            let cached = app.cached_manifest().await?;
            let records = store.count().await?;
            print_json(&json!({
                "store": store.location(),
                "records": records,
                "cached_record": cached.as_ref().map(|m| m.record_id()),
                "tables": cached.as_ref().map(|m| m.tables().len()),
            }));
        }

        Commands::Lookup { table, hash } => {
            let manifest = app
                .cached_manifest()
                .await?
                .context("Manifest is not cached, run `swampfox bootstrap` first")?;
            let definition = manifest.definition(&table, hash).with_context(|| {
                format!("No {} with hash {} (id {})", table, hash, signed_hash(hash))
            })?;
            print_json(definition);
        }

        Commands::Profile {
            membership_id,
            membership_type,
        } => print_json(&app.bungie.fetch_profile(membership_id, membership_type).await?),

        Commands::Roster => print_json(&app.bungie.fetch_clan_members().await?),

        Commands::Character {
            membership_id,
            character_id,
        } => print_json(
            &app.bungie
                .fetch_character(membership_id, character_id)
                .await?,
        ),

        Commands::Stats { resource } => {
            let resource = BackendResource::from(resource);
            print_json(&app.backend.fetch(&resource).await?);
        }

        Commands::Config { output } => write_config(output.as_deref())?,
    }

    Ok(())
}

fn write_config(output: Option<&Path>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("swampfox={}", logging.level).into());

    // Logs go to stderr so stdout stays pipeable JSON
    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
