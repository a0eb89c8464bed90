//! Connection pool configuration

pub mod defaults;
mod settings;

pub use settings::PoolConfig;
