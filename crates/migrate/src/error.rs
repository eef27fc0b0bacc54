//! Error types for the migration engine
//!
//! Configuration problems fail before any unit runs. Hook and driver
//! failures abort a running sequence; units applied before the failure
//! stay applied.

use std::path::PathBuf;

use shift_core::ConfigError;
use thiserror::Error;

use crate::hooks::HookPhase;
use crate::unit::UnitRef;
use crate::version::{Direction, Version};

/// Boxed error coming from a storage driver, kept as-is
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid driver URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No driver registered for URL scheme '{0}'")]
    UnknownDriver(String),

    #[error("No {direction} migration found for version {version}")]
    NotFound { version: Version, direction: Direction },

    #[error("{phase}-hook rejected {unit}: {message}")]
    Hook {
        phase: HookPhase,
        unit: UnitRef,
        message: String,
    },

    #[error("Driver error: {0}")]
    Driver(#[source] DriverError),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Requested {requested} {direction} migration(s) but only {available} available")]
    InsufficientUnits {
        direction: Direction,
        requested: u64,
        available: u64,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration store error: {0}")]
    Store(String),
}

impl MigrateError {
    /// Wrap a driver-specific error without reinterpreting it
    pub fn driver(err: impl Into<DriverError>) -> Self {
        MigrateError::Driver(err.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrateError::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(unit: UnitRef) -> Self {
        MigrateError::NotFound {
            version: unit.version,
            direction: unit.direction,
        }
    }

    /// Failed before anything could be attempted
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MigrateError::Config(_) | MigrateError::InvalidUrl { .. } | MigrateError::UnknownDriver(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MigrateError::NotFound { .. })
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, MigrateError::Hook { .. })
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, MigrateError::Driver(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, MigrateError::Unsupported(_))
    }
}
