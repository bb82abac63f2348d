//! Configuration management for the ReviewLens server

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    pub collection: String,
    /// Create the review indexes at startup
    #[serde(default)]
    pub ensure_indexes: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// Upper bound on a single aggregation, pushed down to the store
    pub max_time_ms: u64,
    /// Let heavy stages spill to disk instead of failing on memory limits
    pub allow_disk_use: bool,
    /// Latest review date in the dataset, anchor of every weeks-back window
    pub dataset_max_date: NaiveDate,
    /// Sample window used by the sampled analytics
    pub sample_size: u64,
    /// Larger sample window for the verified-vs-unverified comparison
    pub stats_sample_size: u64,
    /// Hard ceiling on `limit`, whatever the client asks for
    pub max_page_limit: u64,
}

impl QueryConfig {
    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // REVIEWLENS__QUERY__SAMPLE_SIZE=5000 style overrides
            .add_source(
                Environment::with_prefix("REVIEWLENS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Variables understood by the original deployment scripts
            .set_override_option("database.url", env::var("MONGO_URI").ok())?
            .set_override_option("database.name", env::var("MONGO_DB_NAME").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            name: "oncoquery".to_string(),
            collection: "reviews".to_string(),
            ensure_indexes: false,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_time_ms: 30_000,
            allow_disk_use: true,
            dataset_max_date: NaiveDate::from_ymd_opt(2015, 8, 31).unwrap_or_default(),
            sample_size: 1_000,
            stats_sample_size: 10_000,
            max_page_limit: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
