//! PostgreSQL Driver
//!
//! Applies migration units with sqlx. Each unit runs in its own transaction
//! together with the insert or delete of its version row, so a failed unit
//! leaves neither its schema changes nor its version record behind.

use async_trait::async_trait;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::driver::Driver;
use crate::error::{MigrateError, MigrateResult};
use crate::registry::{DriverFactory, DriverUrl};
use crate::unit::MigrationUnit;
use crate::version::{AppliedVersions, Direction, Version};

/// SQL used to maintain the applied-version table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTableSql {
    table: String,
}

impl VersionTableSql {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into() }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL to create the version tracking table
    pub fn create_table(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version BIGINT PRIMARY KEY,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n\
            )",
            self.table
        )
    }

    /// SQL to record a version as applied
    pub fn insert_version(&self) -> String {
        format!("INSERT INTO {} (version) VALUES ($1)", self.table)
    }

    /// SQL to remove a version record (for rollback)
    pub fn delete_version(&self) -> String {
        format!("DELETE FROM {} WHERE version = $1", self.table)
    }

    /// SQL to get the highest applied version
    pub fn latest_version(&self) -> String {
        format!(
            "SELECT version FROM {} ORDER BY version DESC LIMIT 1",
            self.table
        )
    }

    /// SQL to get every applied version
    pub fn applied_versions(&self) -> String {
        format!("SELECT version FROM {} ORDER BY version ASC", self.table)
    }
}

/// Split SQL statements for execution using proper SQL parsing
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Vec::new();
    }

    match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(parsed) => parsed.into_iter().map(|stmt| stmt.to_string()).collect(),
        Err(e) => {
            // sqlparser does not cover every PostgreSQL construct
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        }
    }
}

fn to_db_version(version: Version) -> MigrateResult<i64> {
    i64::try_from(version.get())
        .map_err(|_| MigrateError::driver(format!("version {} does not fit in BIGINT", version)))
}

fn from_db_version(value: i64) -> MigrateResult<Version> {
    u64::try_from(value)
        .map(Version)
        .map_err(|_| MigrateError::driver(format!("negative version {} in migrations table", value)))
}

/// PostgreSQL driver backed by a small sqlx pool
#[derive(Debug, Clone)]
pub struct PostgresDriver {
    pool: PgPool,
    sql: VersionTableSql,
}

impl PostgresDriver {
    /// Connect and make sure the version table exists
    pub async fn connect(url: &DriverUrl) -> MigrateResult<Self> {
        if url.database().is_none() {
            return Err(MigrateError::invalid_url(url.as_str(), "no database name"));
        }

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url.connection_url())
            .await
            .map_err(MigrateError::driver)?;

        let driver = Self::from_pool(pool, url.migrations_table());
        driver.ensure_version_table().await?;
        Ok(driver)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, migrations_table: &str) -> Self {
        Self {
            pool,
            sql: VersionTableSql::new(migrations_table),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_version_table(&self) -> MigrateResult<()> {
        sqlx::query(&self.sql.create_table())
            .execute(&self.pool)
            .await
            .map_err(MigrateError::driver)?;
        Ok(())
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn migrate(&self, unit: &MigrationUnit) -> MigrateResult<()> {
        let content = unit
            .content_str()
            .ok_or_else(|| MigrateError::driver(format!("content of {} was not loaded", unit)))?
            .map_err(MigrateError::driver)?;
        let version = to_db_version(unit.version)?;

        let mut transaction = self.pool.begin().await.map_err(MigrateError::driver)?;

        for statement in split_sql_statements(content) {
            sqlx::query(&statement)
                .execute(&mut *transaction)
                .await
                .map_err(MigrateError::driver)?;
        }

        let record_sql = match unit.direction {
            Direction::Up => self.sql.insert_version(),
            Direction::Down => self.sql.delete_version(),
        };
        sqlx::query(&record_sql)
            .bind(version)
            .execute(&mut *transaction)
            .await
            .map_err(MigrateError::driver)?;

        transaction.commit().await.map_err(MigrateError::driver)?;
        Ok(())
    }

    async fn version(&self) -> MigrateResult<Version> {
        let latest: Option<i64> = sqlx::query_scalar(&self.sql.latest_version())
            .fetch_optional(&self.pool)
            .await
            .map_err(MigrateError::driver)?;

        match latest {
            Some(value) => from_db_version(value),
            None => Ok(Version::ZERO),
        }
    }

    async fn versions(&self) -> MigrateResult<AppliedVersions> {
        let rows: Vec<i64> = sqlx::query_scalar(&self.sql.applied_versions())
            .fetch_all(&self.pool)
            .await
            .map_err(MigrateError::driver)?;

        let versions = rows
            .into_iter()
            .map(from_db_version)
            .collect::<MigrateResult<Vec<_>>>()?;
        Ok(AppliedVersions::from_unsorted(versions))
    }

    async fn execute(&self, statement: &str) -> MigrateResult<()> {
        self.pool
            .execute(statement)
            .await
            .map_err(MigrateError::driver)?;
        Ok(())
    }

    async fn close(&self) -> MigrateResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Factory for `postgres://` and `postgresql://` URLs
#[derive(Debug, Default)]
pub struct PostgresDriverFactory;

#[async_trait]
impl DriverFactory for PostgresDriverFactory {
    async fn open(&self, url: &DriverUrl) -> MigrateResult<Box<dyn Driver>> {
        Ok(Box::new(PostgresDriver::connect(url).await?))
    }
}
