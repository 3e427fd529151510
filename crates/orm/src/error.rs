//! Error types for the ORM system
//!
//! Two families of failures exist. Persistence failures (a statement that did
//! not execute, an insert that produced no id) are reported by the model
//! surface as `Ok(false)`. Everything else in this module signals a defect in a
//! model definition or call site and is returned as `Err`.

use std::fmt;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Statement execution failed in the driver
    Database(String),
    /// Model not found in database
    NotFound(String),
    /// Primary key value is missing on the model
    MissingPrimaryKey,
    /// The model type declares no primary key name
    MissingKeyName(String),
    /// Relation name is not registered for the model type
    RelationNotFound { model: String, relation: String },
    /// Relation was read before being loaded
    RelationNotLoaded { model: String, relation: String },
    /// Registered relation factory produces a different related type
    RelationMapping {
        model: String,
        relation: String,
        expected: String,
        registered: String,
    },
    /// Loaded relation holds a different shape (many vs one) than requested
    RelationType(String),
    /// Relation store misuse (busy store, state/payload mismatch)
    RelationStore(String),
    /// Malformed `with()` constraint such as `"relation:"`
    InvalidWithConstraint(String),
    /// `fill()` on a totally guarded model
    MassAssignment { model: String, attribute: String },
    /// Date string does not match the storage format
    DateParse { value: String, format: String },
    /// Connection resolution error
    Connection(String),
    /// Configuration error
    Configuration(String),
    /// Query building error
    Query(String),
    /// Serialization/deserialization error
    Serialization(String),
}

impl ModelError {
    /// Whether the error comes from executing a statement rather than from a
    /// defect in the calling code
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, ModelError::Database(_))
    }

    pub(crate) fn relation_not_found(model: &str, relation: &str) -> Self {
        ModelError::RelationNotFound {
            model: model.to_string(),
            relation: relation.to_string(),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::NotFound(table) => write!(f, "Record not found in table '{}'", table),
            ModelError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ModelError::MissingKeyName(model) => {
                write!(f, "No primary key defined on model '{}'", model)
            }
            ModelError::RelationNotFound { model, relation } => write!(
                f,
                "Relation '{}' is not defined on model '{}', register it in register_relations()",
                relation, model
            ),
            ModelError::RelationNotLoaded { model, relation } => write!(
                f,
                "Relation '{}' is not loaded on model '{}'",
                relation, model
            ),
            ModelError::RelationMapping {
                model,
                relation,
                expected,
                registered,
            } => write!(
                f,
                "Relation '{}' on model '{}' is registered for '{}', but was requested as '{}'",
                relation, model, registered, expected
            ),
            ModelError::RelationType(msg) => write!(f, "Relation type error: {}", msg),
            ModelError::RelationStore(msg) => write!(f, "Relation store error: {}", msg),
            ModelError::InvalidWithConstraint(msg) => {
                write!(f, "Invalid with() constraint: {}", msg)
            }
            ModelError::MassAssignment { model, attribute } => write!(
                f,
                "Add '{}' to the fillable attributes to allow mass assignment on '{}'",
                attribute, model
            ),
            ModelError::DateParse { value, format } => write!(
                f,
                "Could not parse the datetime '{}' using the given format '{}'",
                value, format
            ),
            ModelError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::Query(msg) => write!(f, "Query error: {}", msg),
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<tinyorm_core::ConfigError> for ModelError {
    fn from(err: tinyorm_core::ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

/// Error types raised by connections before or while executing a statement
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection '{name}' is not configured")]
    UnknownConnection { name: String },

    #[error("No connection resolver is set")]
    MissingResolver,

    #[error("Statement failed: {0}")]
    Statement(String),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Driver error: {0}")]
    Driver(#[from] sqlx::Error),

    #[error("Driver not available: {0}")]
    DriverUnavailable(String),
}

impl From<ConnectionError> for ModelError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Statement(msg) => ModelError::Database(msg),
            ConnectionError::Driver(sqlx_err) => ModelError::Database(sqlx_err.to_string()),
            other => ModelError::Connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_failures() {
        assert!(ModelError::Database("deadlock".into()).is_persistence_failure());
        assert!(!ModelError::MissingKeyName("Torrent".into()).is_persistence_failure());
        assert!(!ModelError::relation_not_found("Torrent", "files").is_persistence_failure());
    }

    #[test]
    fn test_connection_error_mapping() {
        let err: ModelError = ConnectionError::Statement("syntax error".into()).into();
        assert_eq!(err, ModelError::Database("syntax error".into()));

        let err: ModelError = ConnectionError::UnknownConnection { name: "crystal".into() }.into();
        assert!(matches!(err, ModelError::Connection(msg) if msg.contains("crystal")));

        let err: ModelError = ConnectionError::DriverUnavailable("connection 'crystal' needs the 'memory' feature".into()).into();
        assert!(!err.is_persistence_failure());
        assert!(matches!(err, ModelError::Connection(msg) if msg.contains("'memory' feature")));
    }

    #[test]
    fn test_date_parse_message_names_value_and_format() {
        let err = ModelError::DateParse {
            value: "2021-13-45".into(),
            format: "%Y-%m-%d".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2021-13-45"));
        assert!(msg.contains("%Y-%m-%d"));
    }
}
