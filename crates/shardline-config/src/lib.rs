//! Runtime configuration for shardline sessions, routers and executors.
//!
//! Configuration is plain serde data. Every section carries defaults so a
//! partial (or empty) TOML document is always a valid configuration.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Result sets larger than this are never cached by default.
pub const DEFAULT_MAX_CACHED_ROWS: usize = 5000;

/// Minimum number of resolved partitions before fan-out runs in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 3;

/// Database used for statements over tables that are not partitioned.
pub const DEFAULT_DATABASE: &str = "default";

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config value for '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

///
/// ShardlineConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShardlineConfig {
    pub executor: ExecutorConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
}

impl ShardlineConfig {
    /// Parse and validate a configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    /// Render this configuration back into TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.executor.validate()?;
        self.cache.validate()?;
        self.session.validate()
    }
}

///
/// ExecutorConfig
///
/// Fan-out policy. Plans resolving to `parallel_threshold` or more
/// partitions run on the shared worker pool.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    pub parallel_threshold: usize,

    /// Worker pool size; `None` lets the pool pick one thread per core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            worker_threads: None,
        }
    }
}

impl ExecutorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "executor.parallel_threshold",
                message: "must be at least 1".to_string(),
            });
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "executor.worker_threads",
                message: "must be at least 1 when set".to_string(),
            });
        }

        Ok(())
    }
}

///
/// CacheConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Log every store, hit and miss.
    pub debug: bool,

    pub max_rows: usize,

    /// Dialect label mixed into predicate signatures.
    pub dialect: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            max_rows: DEFAULT_MAX_CACHED_ROWS,
            dialect: "generic".to_string(),
        }
    }
}

impl CacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dialect.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "cache.dialect",
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

///
/// SessionConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub default_database: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_database.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "session.default_database",
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

///
/// TESTS
///
