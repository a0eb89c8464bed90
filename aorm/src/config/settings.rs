//! Pool configuration settings

use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::defaults;
use crate::error::{Error, Result};

/// Connection parameters and pool sizing.
///
/// `user`, `password` and `database` have no defaults; [`PoolConfig::validate`]
/// rejects a config that leaves any of them unset.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Database host
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user (required)
    #[serde(default)]
    pub user: Option<String>,

    /// Login password (required, may be empty)
    #[serde(default)]
    pub password: Option<String>,

    /// Schema to connect to (required)
    #[serde(default, alias = "db")]
    pub database: Option<String>,

    /// Connection character set, applied with `SET NAMES`
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Session autocommit mode
    #[serde(default = "default_autocommit")]
    pub autocommit: bool,

    /// Upper bound on open connections
    #[serde(default = "default_max_size", alias = "maxsize")]
    pub max_size: usize,

    /// Connections opened eagerly when the pool starts
    #[serde(default = "default_min_size", alias = "minsize")]
    pub min_size: usize,

    /// How long a checkout waits for a free connection
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error) for binaries.
    /// Overridden by RUST_LOG.
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_host() -> String {
    defaults::HOST.to_string()
}
fn default_port() -> u16 {
    defaults::PORT
}
fn default_charset() -> String {
    defaults::CHARSET.to_string()
}
fn default_autocommit() -> bool {
    defaults::AUTOCOMMIT
}
fn default_max_size() -> usize {
    defaults::MAX_SIZE
}
fn default_min_size() -> usize {
    defaults::MIN_SIZE
}
fn default_acquire_timeout_ms() -> u64 {
    defaults::ACQUIRE_TIMEOUT_MS
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            database: None,
            charset: default_charset(),
            autocommit: default_autocommit(),
            max_size: default_max_size(),
            min_size: default_min_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            log_level: None,
        }
    }
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("autocommit", &self.autocommit)
            .field("max_size", &self.max_size)
            .field("min_size", &self.min_size)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

impl PoolConfig {
    /// Create a config with the three required parameters and defaults for the rest.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
            database: Some(database.into()),
            ..Default::default()
        }
    }

    /// Set the database host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the database port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection character set.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the session autocommit mode.
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Set the maximum number of connections in the pool.
    pub fn max_size(mut self, max: usize) -> Self {
        self.max_size = max;
        self
    }

    /// Set the number of connections opened at startup.
    pub fn min_size(mut self, min: usize) -> Self {
        self.min_size = min;
        self
    }

    /// Set how long a checkout may wait for a free connection.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Checkout wait limit as a `Duration`.
    pub fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration using config-rs (file + environment variables)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        } else {
            builder = builder.add_source(File::with_name(defaults::CONFIG_FILE).required(false));
        }

        // Override with environment variables (AORM_USER, AORM_MAX_SIZE, ...)
        builder = builder.add_source(Environment::with_prefix(defaults::ENV_PREFIX).try_parsing(true));

        let config: PoolConfig = builder.build()?.try_deserialize()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ];
        for (name, value) in required {
            if value.is_none() {
                return Err(Error::Config(format!("{} is required", name)));
            }
        }

        if self.max_size == 0 {
            return Err(Error::Config("max_size must be at least 1".into()));
        }

        if u32::try_from(self.max_size).is_err() {
            return Err(Error::Config(format!("max_size {} is too large", self.max_size)));
        }

        if self.min_size > self.max_size {
            return Err(Error::Config(format!(
                "min_size ({}) must not exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }

        // Sent verbatim in `SET NAMES`
        if self.charset.is_empty()
            || !self
                .charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Config(format!("invalid charset '{}'", self.charset)));
        }

        Ok(())
    }
}
