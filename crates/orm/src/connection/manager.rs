//! Named connection registry

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tinyorm_core::{DatabaseConfig, DatabaseDriver, DEFAULT_CONNECTION_NAME};

use super::resolver::ConnectionResolver;
#[cfg(any(test, feature = "memory"))]
use crate::backends::MemoryConnection;
use crate::backends::{Connection, PostgresConnection};
use crate::error::{ConnectionError, OrmResult};

/// Registry of named connections, the default [`ConnectionResolver`]
pub struct DatabaseManager {
    default_connection: String,
    connections: RwLock<HashMap<String, Arc<dyn Connection>>>,
}

impl fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("default_connection", &self.default_connection)
            .field("connections", &self.connection_names())
            .finish()
    }
}

impl DatabaseManager {
    /// Create an empty manager whose default connection is `default_connection`
    pub fn new(default_connection: impl Into<String>) -> Self {
        Self {
            default_connection: default_connection.into(),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// A manager with a single in-memory default connection
    #[cfg(any(test, feature = "memory"))]
    pub fn in_memory() -> Self {
        Self::new(DEFAULT_CONNECTION_NAME)
            .with_connection(Arc::new(MemoryConnection::new(DEFAULT_CONNECTION_NAME)))
    }

    /// Build every configured connection
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let manager = Self::new(config.default_connection.clone());

        for connection in &config.connections {
            let built: Arc<dyn Connection> = match connection.driver {
                #[cfg(any(test, feature = "memory"))]
                DatabaseDriver::Memory => Arc::new(
                    MemoryConnection::new(connection.name.clone())
                        .with_date_format(connection.date_format.clone()),
                ),
                #[cfg(not(any(test, feature = "memory")))]
                DatabaseDriver::Memory => {
                    return Err(ConnectionError::DriverUnavailable(format!(
                        "connection '{}' needs the 'memory' feature",
                        connection.name
                    )));
                }
                DatabaseDriver::Postgres => {
                    let url = connection.url.as_deref().ok_or_else(|| {
                        ConnectionError::Statement(format!(
                            "connection '{}' has no database url",
                            connection.name
                        ))
                    })?;
                    Arc::new(PostgresConnection::connect(
                        connection.name.clone(),
                        url,
                        connection.max_connections,
                        &connection.date_format,
                    )?)
                }
            };
            manager.add_connection(built);
        }

        tracing::info!(
            "Database manager ready with {} connection(s), default '{}'",
            config.connections.len(),
            config.default_connection
        );
        Ok(manager)
    }

    /// Register a connection under its own name
    pub fn with_connection(self, connection: Arc<dyn Connection>) -> Self {
        self.add_connection(connection);
        self
    }

    /// Register a connection, replacing one with the same name
    pub fn add_connection(&self, connection: Arc<dyn Connection>) {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        connections.insert(connection.name().to_string(), connection);
    }

    /// Names of the registered connections, sorted
    pub fn connection_names(&self) -> Vec<String> {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = connections.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ConnectionResolver for DatabaseManager {
    fn connection(&self, name: Option<&str>) -> OrmResult<Arc<dyn Connection>> {
        let name = name.unwrap_or(&self.default_connection);
        let connections = self
            .connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        connections.get(name).cloned().ok_or_else(|| {
            ConnectionError::UnknownConnection {
                name: name.to_string(),
            }
            .into()
        })
    }

    fn default_connection_name(&self) -> &str {
        &self.default_connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::resolve_connection;
    use crate::error::ModelError;
    use tinyorm_core::ConnectionConfig;

    #[test]
    fn test_from_config_builds_memory_connections() {
        let config = DatabaseConfig::testing()
            .with_connection(ConnectionConfig::memory("crystal").with_date_format("%d.%m.%Y"));

        let manager = DatabaseManager::from_config(&config).unwrap();
        assert_eq!(manager.connection_names(), ["crystal", "default"]);

        let crystal = manager.connection(Some("crystal")).unwrap();
        assert_eq!(crystal.grammar().date_format(), "%d.%m.%Y");
        assert_eq!(manager.connection(None).unwrap().name(), "default");
    }

    #[test]
    fn test_unknown_connection() {
        let manager = DatabaseManager::in_memory();
        let result = manager.connection(Some("missing"));
        assert!(matches!(result, Err(ModelError::Connection(msg)) if msg.contains("missing")));
    }

    #[test]
    fn test_explicit_resolver_wins() {
        let resolver: Arc<dyn ConnectionResolver> = Arc::new(DatabaseManager::in_memory());
        let connection = resolve_connection(Some(&resolver), None).unwrap();
        assert_eq!(connection.name(), "default");
    }
}
