//! Default pool configuration values - single source of truth

/// Default database host
pub const HOST: &str = "localhost";

/// Default MySQL port
pub const PORT: u16 = 3306;

/// Default connection character set
pub const CHARSET: &str = "utf8";

/// Whether connections run with autocommit enabled by default
pub const AUTOCOMMIT: bool = true;

/// Default upper bound on open connections
pub const MAX_SIZE: usize = 10;

/// Default number of connections opened at startup
pub const MIN_SIZE: usize = 1;

/// Default time a checkout may wait for a free connection
pub const ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Default config file name searched by `PoolConfig::load`
pub const CONFIG_FILE: &str = "aorm";

/// Prefix for environment variable overrides (`AORM_USER`, `AORM_MAX_SIZE`, ...)
pub const ENV_PREFIX: &str = "AORM";
