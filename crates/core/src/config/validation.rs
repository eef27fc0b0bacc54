use thiserror::Error;

/// Configuration error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
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

    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::MissingRequired { field, .. } | Self::InvalidValue { field, .. } => field,
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Driver URL validator
///
/// Only checks the shape `<scheme>://...`; drivers parse the rest.
pub struct DriverUrlValidator;

impl ConfigValidator<str> for DriverUrlValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "driver_url",
                value,
                "non-empty URL such as postgres://user@host/db",
            ));
        }

        let scheme = match value.split_once("://") {
            Some((scheme, _)) => scheme,
            None => {
                return Err(ConfigError::invalid_value(
                    "driver_url",
                    value,
                    "URL with a scheme, e.g. postgres://...",
                ))
            }
        };

        let valid_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
        if !valid_scheme {
            return Err(ConfigError::invalid_value(
                "driver_url",
                value,
                "alphanumeric URL scheme",
            ));
        }

        Ok(())
    }
}

/// Log filter validator
pub struct LogFilterValidator;

impl ConfigValidator<str> for LogFilterValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "log_filter",
                value,
                "a tracing filter directive such as `info` or `shift_migrate=debug`",
            ));
        }
        Ok(())
    }
}
