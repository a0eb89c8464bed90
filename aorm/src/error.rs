//! Error types for aorm

use std::time::Duration;

use thiserror::Error;

/// Result type alias for aorm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during pool management and statement execution
#[derive(Error, Debug)]
pub enum Error {
    /// A required connection parameter is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// `initialize` was called while a pool is already live
    #[error("Connection pool is already initialized")]
    AlreadyInitialized,

    /// The pool was never initialized or has been shut down
    #[error("Connection pool is not initialized")]
    NotInitialized,

    /// No connection became available within the acquire timeout
    #[error("Connection pool exhausted: all {max_size} connections busy for {timeout:?}")]
    PoolExhausted { max_size: usize, timeout: Duration },

    /// MySQL driver error
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// Statement rejected by the driver
    #[error("Statement error: {0}")]
    Statement(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Type conversion error
    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion {
        expected: &'static str,
        actual: String,
    },

    /// Column not found in row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Null value for non-optional field
    #[error("Unexpected null value for column: {0}")]
    UnexpectedNull(String),

    /// Row decode error
    #[error("Failed to decode row: {0}")]
    RowDecode(String),
}
