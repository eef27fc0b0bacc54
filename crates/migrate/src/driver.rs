//! Driver capability
//!
//! A driver applies migration units to a backing store and keeps the record
//! of applied versions. These traits abstract away store-specific details so
//! the engine can work with any backend.

use async_trait::async_trait;

use crate::error::{MigrateError, MigrateResult};
use crate::unit::MigrationUnit;
use crate::version::{AppliedVersions, Version};

/// Default file extension for migration files
pub const DEFAULT_FILE_EXTENSION: &str = "sql";

/// Abstract storage driver
#[async_trait]
pub trait Driver: Send + Sync {
    /// Apply one unit and record the resulting version state
    ///
    /// Up inserts the unit's version, Down deletes it. Either the unit's
    /// effect and its version record both land, or neither does.
    async fn migrate(&self, unit: &MigrationUnit) -> MigrateResult<()>;

    /// Highest applied version, or zero when nothing is applied
    async fn version(&self) -> MigrateResult<Version> {
        Ok(self.versions().await?.current())
    }

    /// All applied versions, ascending
    async fn versions(&self) -> MigrateResult<AppliedVersions>;

    /// Run an ad-hoc statement
    async fn execute(&self, statement: &str) -> MigrateResult<()> {
        let _ = statement;
        Err(MigrateError::Unsupported(
            "raw statement execution is not supported by this driver".to_string(),
        ))
    }

    /// Release connections; calling it twice is harmless
    async fn close(&self) -> MigrateResult<()>;

    /// Extension of the migration files this driver consumes
    fn file_extension(&self) -> &'static str {
        DEFAULT_FILE_EXTENSION
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn migrate(&self, unit: &MigrationUnit) -> MigrateResult<()> {
        (**self).migrate(unit).await
    }

    async fn version(&self) -> MigrateResult<Version> {
        (**self).version().await
    }

    async fn versions(&self) -> MigrateResult<AppliedVersions> {
        (**self).versions().await
    }

    async fn execute(&self, statement: &str) -> MigrateResult<()> {
        (**self).execute(statement).await
    }

    async fn close(&self) -> MigrateResult<()> {
        (**self).close().await
    }

    fn file_extension(&self) -> &'static str {
        (**self).file_extension()
    }
}
