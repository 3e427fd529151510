//! # Structured Logging
//!
//! Logging bootstrap for applications built on tinyorm. The ORM itself only
//! emits `tracing` events; installing a subscriber is left to the process
//! entry point through [`init_logging`].

use serde_json::{json, Value};
use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Enable pretty printing for development
    pub pretty_print: bool,
    /// Custom fields logged with the initialization message
    pub global_fields: serde_json::Map<String, Value>,
    /// Environment filter (supports directives like "tinyorm=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: true,
            global_fields: serde_json::Map::new(),
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create production logging configuration
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            global_fields: {
                let mut fields = serde_json::Map::new();
                fields.insert("env".to_string(), json!("production"));
                fields
            },
            env_filter: Some("tinyorm=info,sqlx=warn".to_string()),
        }
    }

    /// Create development logging configuration
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            global_fields: {
                let mut fields = serde_json::Map::new();
                fields.insert("env".to_string(), json!("development"));
                fields
            },
            env_filter: Some("tinyorm=debug,sqlx=info".to_string()),
        }
    }

    /// Create test logging configuration (minimal output)
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            global_fields: serde_json::Map::new(),
            env_filter: Some("tinyorm=error".to_string()),
        }
    }

    /// Preset matching the given environment
    pub fn for_environment(environment: &Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Testing => Self::test(),
            Environment::Production => Self::production(),
        }
    }

    /// Add a global field to the initialization message
    pub fn with_global_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.global_fields.insert(key.into(), value.into());
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The filter directive that will be installed when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Initialize structured logging for the process
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).json())
            .try_init()?;
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout).pretty())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stdout))
            .try_init()?;
    }

    if config.global_fields.is_empty() {
        tracing::info!(
            target: "tinyorm::logging",
            "Structured logging initialized (level: {}, format: {})",
            config.level,
            if config.json_format { "JSON" } else { "text" }
        );
    } else {
        let mut init_msg = json!({
            "message": "Structured logging initialized",
            "level": config.level,
            "json_format": config.json_format,
        });
        for (key, value) in config.global_fields {
            init_msg[key] = value;
        }
        tracing::info!(target: "tinyorm::logging", "{}", init_msg);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(LoggingConfig::production().json_format);
        assert!(!LoggingConfig::development().json_format);
        assert_eq!(LoggingConfig::test().level, "error");
    }

    #[test]
    fn test_filter_directive_prefers_env_filter() {
        let config = LoggingConfig::default();
        assert_eq!(config.filter_directive(), "info");

        let config = config.with_env_filter("tinyorm=trace");
        assert_eq!(config.filter_directive(), "tinyorm=trace");
    }

    #[test]
    fn test_for_environment() {
        let config = LoggingConfig::for_environment(&Environment::Testing);
        assert_eq!(config.filter_directive(), "tinyorm=error");
    }

    #[test]
    fn test_global_fields() {
        let config = LoggingConfig::default().with_global_field("service", "torrents");
        assert_eq!(config.global_fields["service"], json!("torrents"));
    }
}
