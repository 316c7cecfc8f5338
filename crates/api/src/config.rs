//! Service Configuration
//!
//! Defaults, then an optional `airquality.toml`, then environment variables
//! (unprefixed, e.g. `PORT`, `IQAIR_API_KEY`).

use crate::rate_limit::RateLimitConfig;
use config::{Config, ConfigError, Environment, File};
use iqair::IqAirConfig;
use recorder::{FixedLocation, RecorderConfig};
use serde::Deserialize;
use std::time::Duration;

/// Which `ReadingStore` backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    /// SQLite file (or `sqlite::memory:` via `DATABASE_URL`)
    Sqlite,
    /// Process-local store, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// `development` or `production`
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_iqair_base_url")]
    pub iqair_base_url: String,

    #[serde(default)]
    pub iqair_api_key: String,

    #[serde(default = "default_db_driver")]
    pub db_driver: DbDriver,

    /// Database file name, without extension
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Directory holding the database file
    #[serde(default)]
    pub db_dir: Option<String>,

    /// Full connection string; overrides `db_name`/`db_dir`
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Global path prefix for the API routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default = "default_recorder_interval_secs")]
    pub recorder_interval_secs: u64,

    #[serde(default = "default_recorder_location")]
    pub recorder_location: String,

    #[serde(default = "default_recorder_latitude")]
    pub recorder_latitude: f64,

    #[serde(default = "default_recorder_longitude")]
    pub recorder_longitude: f64,

    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u64,

    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_port() -> u16 {
    6061
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_iqair_base_url() -> String {
    iqair::DEFAULT_BASE_URL.to_string()
}

fn default_db_driver() -> DbDriver {
    DbDriver::Sqlite
}

fn default_db_name() -> String {
    "air-quality-db".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_api_prefix() -> String {
    "v1".to_string()
}

fn default_recorder_interval_secs() -> u64 {
    60
}

fn default_recorder_location() -> String {
    FixedLocation::default().label
}

fn default_recorder_latitude() -> f64 {
    FixedLocation::default().latitude
}

fn default_recorder_longitude() -> f64 {
    FixedLocation::default().longitude
}

fn default_rate_limit_per_second() -> u64 {
    RateLimitConfig::default().per_second
}

fn default_rate_limit_burst() -> u32 {
    RateLimitConfig::default().burst_size
}

impl Settings {
    /// Load from `airquality.toml` (if present) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("airquality").required(false))
            .add_source(Environment::default())
            .build()?
            .try_deserialize()
    }

    /// Load from an explicit environment source only
    pub fn from_env_source(env: Environment) -> Result<Self, ConfigError> {
        Config::builder().add_source(env).build()?.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// `DATABASE_URL`, or `sqlite://[{db_dir}/]{db_name}.db`
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        match &self.db_dir {
            Some(dir) => format!("sqlite://{}/{}.db", dir.trim_end_matches('/'), self.db_name),
            None => format!("sqlite://{}.db", self.db_name),
        }
    }

    pub fn iqair(&self) -> IqAirConfig {
        IqAirConfig {
            base_url: self.iqair_base_url.clone(),
            api_key: self.iqair_api_key.clone(),
        }
    }

    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            interval: Duration::from_secs(self.recorder_interval_secs.max(1)),
            location: FixedLocation {
                label: self.recorder_location.clone(),
                latitude: self.recorder_latitude,
                longitude: self.recorder_longitude,
            },
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            per_second: self.rate_limit_per_second,
            burst_size: self.rate_limit_burst,
        }
    }
}
