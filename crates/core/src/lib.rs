//! # tinyorm-core
//!
//! Shared foundation for the tinyorm workspace: environment driven database
//! configuration and the structured logging bootstrap.

pub mod config;
pub mod logging;

pub use config::{
    AppConfigTrait, ConfigSource, ConnectionConfig, DatabaseConfig, DatabaseDriver, Environment,
    DEFAULT_CONNECTION_NAME, DEFAULT_DATE_FORMAT,
};
pub use config::validation::ConfigError;
pub use logging::{init_logging, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get framework version
pub fn version() -> &'static str {
    VERSION
}
