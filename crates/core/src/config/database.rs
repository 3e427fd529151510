//! Database configuration
//!
//! Describes the named connections the ORM's connection manager builds at
//! startup. Values come from the environment with development friendly
//! defaults.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::config::{
    AppConfigTrait, ConfigError, ConfigSource, ConfigValidator, DatabaseUrlValidator,
    DateFormatValidator, Environment,
};

/// Storage format used for date columns when nothing else is configured
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the connection used when a model does not ask for a specific one
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Supported database drivers
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// In-process table store, used by tests and embedded tools
    Memory,
    /// PostgreSQL through sqlx
    Postgres,
}

impl std::fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseDriver::Memory => write!(f, "memory"),
            DatabaseDriver::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for DatabaseDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(DatabaseDriver::Memory),
            "postgres" | "postgresql" | "pgsql" => Ok(DatabaseDriver::Postgres),
            _ => Err(ConfigError::invalid_value("driver", s, "memory or postgres")),
        }
    }
}

/// A single named connection
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub driver: DatabaseDriver,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_max_connections() -> u32 {
    1
}

impl ConnectionConfig {
    /// In-memory connection with the given name
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: DatabaseDriver::Memory,
            url: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_connections: 1,
        }
    }

    /// PostgreSQL connection with the given name and URL
    pub fn postgres(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: DatabaseDriver::Postgres,
            url: Some(url.into()),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_connections: 5,
        }
    }

    /// Override the date storage format
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Validate a single connection
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "connection.name",
                self.name.clone(),
                "non-empty connection name",
            ));
        }

        DateFormatValidator.validate(&self.date_format)?;

        if self.max_connections == 0 {
            return Err(ConfigError::invalid_value(
                "max_connections",
                "0",
                "at least one connection",
            ));
        }

        if self.driver == DatabaseDriver::Postgres {
            let url = self.url.as_ref().ok_or_else(|| {
                ConfigError::missing_required(
                    "url",
                    "DATABASE_URL is required for the postgres driver",
                )
            })?;
            DatabaseUrlValidator::default().validate(url)?;
        }

        Ok(())
    }
}

/// Database configuration for the whole process
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub environment: Environment,
    pub default_connection: String,
    pub connections: Vec<ConnectionConfig>,
}

impl DatabaseConfig {
    /// Create a configuration with a single in-memory default connection
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            default_connection: DEFAULT_CONNECTION_NAME.to_string(),
            connections: vec![ConnectionConfig::memory(DEFAULT_CONNECTION_NAME)],
        }
    }

    /// Create configuration for development
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            default_connection: DEFAULT_CONNECTION_NAME.to_string(),
            connections: vec![ConnectionConfig::postgres(
                DEFAULT_CONNECTION_NAME,
                "postgres://localhost:5432/tinyorm_dev",
            )],
        }
    }

    /// Create configuration for testing
    pub fn testing() -> Self {
        Self {
            environment: Environment::Testing,
            default_connection: DEFAULT_CONNECTION_NAME.to_string(),
            connections: vec![ConnectionConfig::memory(DEFAULT_CONNECTION_NAME)],
        }
    }

    /// Add or replace a named connection
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.retain(|c| c.name != connection.name);
        self.connections.push(connection);
        self
    }

    /// Look up a connection by name
    pub fn connection(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections.iter().find(|c| c.name == name)
    }

    /// The default connection's configuration
    pub fn default_connection_config(&self) -> Option<&ConnectionConfig> {
        self.connection(&self.default_connection)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigTrait for DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("ENVIRONMENT") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::Development,
        };

        let name = env::var("DB_CONNECTION").unwrap_or_else(|_| DEFAULT_CONNECTION_NAME.to_string());
        let url = env::var("DATABASE_URL").ok();

        // Without an explicit driver a database URL implies postgres
        let driver = match env::var("DB_DRIVER") {
            Ok(value) => value.parse()?,
            Err(_) if url.is_some() => DatabaseDriver::Postgres,
            Err(_) => DatabaseDriver::Memory,
        };

        let date_format =
            env::var("DB_DATE_FORMAT").unwrap_or_else(|_| DEFAULT_DATE_FORMAT.to_string());

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(value) => value.parse().map_err(|_| {
                ConfigError::invalid_value("max_connections", value.clone(), "positive integer")
            })?,
            Err(_) => 5,
        };

        let config = Self {
            environment,
            default_connection: name.clone(),
            connections: vec![ConnectionConfig {
                name,
                driver,
                url,
                date_format,
                max_connections,
            }],
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.connections.is_empty() {
            return Err(ConfigError::validation_failed(
                "at least one database connection must be configured",
            ));
        }

        for connection in &self.connections {
            connection.validate()?;
        }

        if self.connection(&self.default_connection).is_none() {
            return Err(ConfigError::invalid_value(
                "default_connection",
                self.default_connection.clone(),
                "name of a configured connection",
            ));
        }

        if self.environment.is_production()
            && self
                .connections
                .iter()
                .any(|c| c.driver == DatabaseDriver::Memory)
        {
            return Err(ConfigError::invalid_value(
                "driver",
                "memory",
                "a persistent driver in production environment",
            ));
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();

        sources.insert(
            "environment".to_string(),
            ConfigSource::env_or_default("ENVIRONMENT", "development"),
        );
        sources.insert(
            "default_connection".to_string(),
            ConfigSource::env_or_default("DB_CONNECTION", DEFAULT_CONNECTION_NAME),
        );
        sources.insert(
            "driver".to_string(),
            ConfigSource::env_or_default("DB_DRIVER", "based on DATABASE_URL"),
        );
        sources.insert(
            "url".to_string(),
            ConfigSource::env_or_default("DATABASE_URL", "none"),
        );
        sources.insert(
            "date_format".to_string(),
            ConfigSource::env_or_default("DB_DATE_FORMAT", DEFAULT_DATE_FORMAT),
        );
        sources.insert(
            "max_connections".to_string(),
            ConfigSource::env_or_default("DB_MAX_CONNECTIONS", "5"),
        );

        sources
    }
}
