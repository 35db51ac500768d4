//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bungie: BungieConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment environment
///
/// Selects how manifest content paths are resolved: `Dev` and `Stg` go
/// through the same-origin proxy prefix, everything else hits the Bungie
/// content host directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Dev,
    Stg,
    #[default]
    Prod,
}

impl Environment {
    /// Whether content requests go through the relative proxy path
    pub fn uses_proxy(&self) -> bool {
        matches!(self, Environment::Dev | Environment::Stg)
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "dev" => Environment::Dev,
            "stg" => Environment::Stg,
            _ => Environment::Prod,
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Stg => write!(f, "stg"),
            Environment::Prod => write!(f, "prod"),
        }
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // Infallible
        Ok(raw.parse().unwrap_or_default())
    }
}

/// Bungie.net (primary upstream) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BungieConfig {
    #[serde(default = "default_bungie_url")]
    pub base_url: String,

    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_authorization")]
    pub authorization: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_content_timeout_ms")]
    pub content_timeout_ms: u64,

    #[serde(default = "default_content_host")]
    pub content_host: String,

    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,

    #[serde(default = "default_proxy_origin")]
    pub proxy_origin: String,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default = "default_clan_id")]
    pub clan_id: u64,

    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_bungie_url() -> String {
    "https://www.bungie.net".to_string()
}

fn default_api_key() -> String {
    "api-key-here".to_string()
}

fn default_authorization() -> String {
    "Fake Token".to_string()
}

fn default_timeout_ms() -> u64 {
    5000 // 5 seconds
}

fn default_content_timeout_ms() -> u64 {
    60_000 // content blobs are large
}

fn default_content_host() -> String {
    "https://bungie.net".to_string()
}

fn default_proxy_prefix() -> String {
    "/bungie".to_string()
}

fn default_proxy_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_clan_id() -> u64 {
    198175
}

fn default_locale() -> String {
    "en".to_string()
}

impl Default for BungieConfig {
    fn default() -> Self {
        Self {
            base_url: default_bungie_url(),
            api_key: default_api_key(),
            authorization: default_authorization(),
            timeout_ms: default_timeout_ms(),
            content_timeout_ms: default_content_timeout_ms(),
            content_host: default_content_host(),
            proxy_prefix: default_proxy_prefix(),
            proxy_origin: default_proxy_origin(),
            environment: Environment::default(),
            clan_id: default_clan_id(),
            locale: default_locale(),
        }
    }
}

/// Private stats backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    #[serde(default = "default_authorization")]
    pub authorization: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:5000/api/".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            authorization: default_authorization(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Local manifest cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,

    #[serde(default = "default_table")]
    pub table: String,
}

fn default_store_path() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("swampfox")
                .join("destinyDb.sqlite3")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./destinyDb.sqlite3".to_string())
}

fn default_table() -> String {
    "destinydata".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            table: default_table(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// A config file that exists but fails to load is logged and skipped.
    pub fn load_default() -> Self {
        match Self::discover() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using default config with environment overrides", e);
                Self::from_env()
            }
        }
    }

    /// Load the first config file found in the default locations
    ///
    /// Falls back to env-only config when no file exists. Unlike
    /// [`Config::load_default`], a broken file is an error.
    pub fn discover() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("swampfox").join("config.toml")),
            Some(PathBuf::from("/etc/swampfox/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::discover_in(&config_paths)
    }

    fn discover_in(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::info!("Using default config with environment overrides");
                Ok(Self::from_env())
            }
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Bungie overrides
        if let Some(env) = lookup("SWAMPFOX_ENV") {
            self.bungie.environment = env.parse().unwrap_or_default();
        }
        if let Some(url) = lookup("SWAMPFOX_BUNGIE_URL") {
            self.bungie.base_url = url;
        }
        if let Some(key) = lookup("SWAMPFOX_API_KEY") {
            self.bungie.api_key = key;
        }

        // Backend overrides
        if let Some(endpoint) = lookup("SWAMPFOX_API_ENDPOINT") {
            self.backend.base_url = endpoint;
        }

        // Store overrides
        if let Some(path) = lookup("SWAMPFOX_STORE_PATH") {
            self.store.path = path;
        }

        // Logging overrides
        if let Some(level) = lookup("SWAMPFOX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SWAMPFOX_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Swampfox Configuration
#
# Environment variables override these settings:
# - SWAMPFOX_ENV
# - SWAMPFOX_BUNGIE_URL
# - SWAMPFOX_API_KEY
# - SWAMPFOX_API_ENDPOINT
# - SWAMPFOX_STORE_PATH
# - SWAMPFOX_LOG_LEVEL
# - SWAMPFOX_LOG_FORMAT

[bungie]
# Bungie.net API host
base_url = "https://www.bungie.net"

# X-API-Key sent with every Bungie request
api_key = "api-key-here"

# Placeholder Authorization header value
authorization = "Fake Token"

# Timeout for API calls (ms)
timeout_ms = 5000

# Timeout for the manifest content download (ms)
content_timeout_ms = 60000

# Deployment environment: dev, stg or prod
# dev/stg fetch content through <proxy_origin><proxy_prefix>
environment = "prod"
content_host = "https://bungie.net"
proxy_prefix = "/bungie"
proxy_origin = "http://localhost:8080"

# Clan whose roster is tracked
clan_id = 198175

# Manifest content locale
locale = "en"

[backend]
# Stats backend base URL
base_url = "http://localhost:5000/api/"
authorization = "Fake Token"
timeout_ms = 5000

[store]
# SQLite file holding the cached manifest
path = "~/.local/share/swampfox/destinyDb.sqlite3"
table = "destinydata"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
