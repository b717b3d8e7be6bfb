use crate::tree::BuildStrategy;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::Deserialize;
use std::{env, str::FromStr, time::Duration};
use thiserror::Error;

/// Prefix of every environment variable read by [`TreeConfig::from_env`]
pub const ENV_PREFIX: &str = "COMMENT_TREE_";

/// Runtime configuration of the comment-tree engine.
///
/// | variable | default |
/// |---|---|
/// | `DATABASE_URL` | `sqlite::memory:` |
/// | `COMMENT_TREE_STRATEGY` | unset, i.e. chosen by store capability |
/// | `COMMENT_TREE_RECURSIVE_CTE` | `true` |
/// | `COMMENT_TREE_CACHE_IDLE_SECS` | `300` |
/// | `COMMENT_TREE_CACHE_MAX_CAPACITY` | `10000` |
/// | `COMMENT_TREE_DELETE_BATCH_SIZE` | `500` |
/// | `COMMENT_TREE_MAX_CONNECTIONS` | unset |
/// | `COMMENT_TREE_CONNECT_TIMEOUT_SECS` | `8` |
/// | `COMMENT_TREE_ACQUIRE_TIMEOUT_SECS` | `8` |
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub database_url: String,
    /// Forces a build strategy instead of picking one from store capability
    pub strategy: Option<BuildStrategy>,
    /// Whether the store may answer full-depth reads with one recursive query
    pub recursive_cte: bool,
    /// Sliding expiration of cached views
    pub cache_idle_secs: u64,
    pub cache_max_capacity: u64,
    /// Ids per `DELETE` statement during subtree deletion
    pub delete_batch_size: usize,
    pub max_connections: Option<u32>,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: String },
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_owned(),
            strategy: None,
            recursive_cte: true,
            cache_idle_secs: 300,
            cache_max_capacity: 10_000,
            delete_batch_size: 500,
            max_connections: None,
            connect_timeout_secs: 8,
            acquire_timeout_secs: 8,
        }
    }
}

impl TreeConfig {
    /// Load from the process environment, reading a `.env` file first if one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(strategy) = var("STRATEGY") {
            config.strategy = Some(parse("STRATEGY", &strategy)?);
        }
        if let Some(flag) = var("RECURSIVE_CTE") {
            config.recursive_cte = parse("RECURSIVE_CTE", &flag)?;
        }
        if let Some(secs) = var("CACHE_IDLE_SECS") {
            config.cache_idle_secs = parse("CACHE_IDLE_SECS", &secs)?;
        }
        if let Some(capacity) = var("CACHE_MAX_CAPACITY") {
            config.cache_max_capacity = parse("CACHE_MAX_CAPACITY", &capacity)?;
        }
        if let Some(size) = var("DELETE_BATCH_SIZE") {
            config.delete_batch_size = parse("DELETE_BATCH_SIZE", &size)?;
        }
        if let Some(max) = var("MAX_CONNECTIONS") {
            config.max_connections = Some(parse("MAX_CONNECTIONS", &max)?);
        }
        if let Some(secs) = var("CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = parse("CONNECT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = var("ACQUIRE_TIMEOUT_SECS") {
            config.acquire_timeout_secs = parse("ACQUIRE_TIMEOUT_SECS", &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delete_batch_size == 0 {
            return Err(ConfigError::Zero {
                key: format!("{ENV_PREFIX}DELETE_BATCH_SIZE"),
            });
        }
        if self.max_connections == Some(0) {
            return Err(ConfigError::Zero {
                key: format!("{ENV_PREFIX}MAX_CONNECTIONS"),
            });
        }
        Ok(())
    }

    pub fn cache_idle(&self) -> Duration {
        Duration::from_secs(self.cache_idle_secs)
    }

    /// Connection options carrying the store's timeout policy
    pub fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.database_url.clone());
        opt.connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);
        // in-memory SQLite databases are per connection, let the driver pick
        if let Some(max) = self.max_connections {
            opt.max_connections(max);
        }
        opt
    }

    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        Database::connect(self.connect_options()).await
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_owned(),
    })
}
