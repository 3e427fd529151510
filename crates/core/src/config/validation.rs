use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Environment variable error: {message}")]
    EnvironmentError { message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Create an environment error
    pub fn environment_error(message: impl Into<String>) -> Self {
        Self::EnvironmentError {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Database URL validator
pub struct DatabaseUrlValidator {
    pub schemes: Vec<String>,
    pub require_database: bool,
}

impl Default for DatabaseUrlValidator {
    fn default() -> Self {
        Self {
            schemes: vec!["postgres".to_string(), "postgresql".to_string()],
            require_database: true,
        }
    }
}

impl ConfigValidator<String> for DatabaseUrlValidator {
    fn validate(&self, value: &String) -> Result<(), ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::invalid_value(
                "url",
                value.clone(),
                "non-empty database URL",
            ));
        }

        let parsed = url::Url::parse(value).map_err(|e| {
            ConfigError::invalid_value("url", value.clone(), format!("valid URL ({})", e))
        })?;

        if !self.schemes.iter().any(|scheme| scheme == parsed.scheme()) {
            return Err(ConfigError::invalid_value(
                "url",
                value.clone(),
                format!("URL with scheme: {}", self.schemes.join(", ")),
            ));
        }

        if parsed.host_str().is_none() {
            return Err(ConfigError::invalid_value(
                "url",
                value.clone(),
                "URL with a host",
            ));
        }

        if self.require_database && parsed.path().trim_start_matches('/').is_empty() {
            return Err(ConfigError::invalid_value(
                "url",
                value.clone(),
                "URL with a database name",
            ));
        }

        Ok(())
    }
}

/// Date format validator, rejects formats chrono can not render
pub struct DateFormatValidator;

impl ConfigValidator<String> for DateFormatValidator {
    fn validate(&self, value: &String) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "date_format",
                value.clone(),
                "non-empty strftime format",
            ));
        }

        if !value.contains('%') {
            return Err(ConfigError::invalid_value(
                "date_format",
                value.clone(),
                "strftime format such as %Y-%m-%d %H:%M:%S",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_validator_accepts_postgres_urls() {
        let validator = DatabaseUrlValidator::default();
        assert!(validator
            .validate(&"postgres://localhost:5432/tinyorm".to_string())
            .is_ok());
        assert!(validator
            .validate(&"postgresql://user:secret@db/tinyorm".to_string())
            .is_ok());
    }

    #[test]
    fn test_database_url_validator_rejects_bad_urls() {
        let validator = DatabaseUrlValidator::default();
        assert!(validator.validate(&String::new()).is_err());
        assert!(validator
            .validate(&"mysql://localhost/tinyorm".to_string())
            .is_err());
        assert!(validator
            .validate(&"postgres://localhost".to_string())
            .is_err());
    }

    #[test]
    fn test_date_format_validator() {
        assert!(DateFormatValidator
            .validate(&"%Y-%m-%d %H:%M:%S".to_string())
            .is_ok());
        assert!(DateFormatValidator.validate(&"  ".to_string()).is_err());
        assert!(DateFormatValidator
            .validate(&"yyyy-MM-dd".to_string())
            .is_err());
    }
}
