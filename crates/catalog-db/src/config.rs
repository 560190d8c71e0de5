//! # Catalog Configuration
//!
//! File and environment configuration for the catalog store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CATALOG_DB_PATH=/var/lib/catalog/catalog.db                        │
//! │     CATALOG_DB_MAX_CONNECTIONS=10                                      │
//! │     CATALOG_MISSING_CATEGORIES=skip                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/catalog/catalog.toml (Linux)                             │
//! │     ~/Library/Application Support/com.catalog.catalog/catalog.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "catalog.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//! idle_timeout_secs = 600
//! run_migrations = true
//!
//! [catalog]
//! missing_categories = "create"  # create | skip
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;
use crate::resolver::MissingCategoryPolicy;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` for a throwaway database.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long to wait for a free connection (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle connections are closed after this long (seconds).
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("catalog.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_true(),
        }
    }
}

// =============================================================================
// Catalog Settings
// =============================================================================

/// `[catalog]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// What product updates do with category names that have no row yet.
    #[serde(default)]
    pub missing_categories: MissingCategoryPolicy,
}

// =============================================================================
// Catalog Config
// =============================================================================

/// Complete catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl CatalogConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform config dir)
    /// 3. Environment variables
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading catalog config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load catalog config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Checks the values that serde cannot.
    pub fn validate(&self) -> ConfigResult<()> {
        let db = &self.database;

        if db.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("database.path", "must not be empty"));
        }

        if db.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be greater than 0",
            ));
        }

        if db.min_connections > db.max_connections {
            return Err(ConfigError::invalid(
                "database.min_connections",
                format!(
                    "{} exceeds max_connections ({})",
                    db.min_connections, db.max_connections
                ),
            ));
        }

        if db.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "database.connect_timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Builds the pool configuration these settings describe.
    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;

        DbConfig::new(&db.path)
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
            .run_migrations(db.run_migrations)
            .missing_categories(self.catalog.missing_categories)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `CATALOG_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("CATALOG_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("CATALOG_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric CATALOG_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(policy) = lookup("CATALOG_MISSING_CATEGORIES") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding missing-category policy from environment");
                    self.catalog.missing_categories = parsed;
                }
                Err(e) => warn!("{}", e),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "catalog", "catalog")
            .map(|dirs| dirs.config_dir().join("catalog.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.database.path, PathBuf::from("catalog.db"));
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
        assert_eq!(
            config.catalog.missing_categories,
            MissingCategoryPolicy::Create
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: CatalogConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/shop.db"
            max_connections = 8

            [catalog]
            missing_categories = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.idle_timeout_secs, 600);
        assert_eq!(config.catalog.missing_categories, MissingCategoryPolicy::Skip);
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        let result: Result<CatalogConfig, _> =
            toml::from_str("[catalog]\nmissing_categories = \"sometimes\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = CatalogConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "database.max_connections", .. })
        ));

        let mut config = CatalogConfig::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::default();
        config.database.path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("CATALOG_DB_PATH", "/data/catalog.db"),
            ("CATALOG_DB_MAX_CONNECTIONS", "12"),
            ("CATALOG_MISSING_CATEGORIES", "skip"),
        ]
        .into_iter()
        .collect();

        let mut config = CatalogConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/catalog.db"));
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.catalog.missing_categories, MissingCategoryPolicy::Skip);
    }

    #[test]
    fn test_bad_overrides_are_ignored() {
        let mut config = CatalogConfig::default();
        config.apply_overrides(|key| match key {
            "CATALOG_DB_MAX_CONNECTIONS" => Some("lots".to_string()),
            "CATALOG_MISSING_CATEGORIES" => Some("maybe".to_string()),
            _ => None,
        });

        assert_eq!(config, CatalogConfig::default());
    }

    #[test]
    fn test_db_config() {
        let mut config = CatalogConfig::default();
        config.database.max_connections = 3;
        config.database.connect_timeout_secs = 7;
        config.catalog.missing_categories = MissingCategoryPolicy::Skip;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("catalog.db"));
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.connect_timeout, Duration::from_secs(7));
        assert_eq!(db.missing_categories, MissingCategoryPolicy::Skip);
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let path = std::env::temp_dir().join("catalog-config-does-not-exist.toml");
        let config = CatalogConfig::from_file(&path);
        assert!(matches!(config, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CatalogConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[database]"));
        assert!(text.contains("[catalog]"));
        assert!(text.contains("missing_categories = \"create\""));
    }
}
