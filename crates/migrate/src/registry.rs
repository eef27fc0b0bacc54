//! Driver registry
//!
//! Maps URL schemes to driver factories. The registry is populated by
//! explicit `register` calls at startup and handed to the engine.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use url::Url;

use crate::driver::Driver;
use crate::error::{MigrateError, MigrateResult};

/// Table (or collection) holding applied versions when the URL names none
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schema_migrations";

/// Query parameter overriding the applied-version table name
pub const MIGRATIONS_TABLE_PARAM: &str = "x-migrations-table";

/// A parsed driver URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverUrl {
    raw: String,
    url: Url,
    migrations_table: String,
}

impl DriverUrl {
    /// Parse a driver URL, extracting the migrations table override
    pub fn parse(raw: &str) -> MigrateResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MigrateError::invalid_url(raw, "URL is empty"));
        }

        let url = Url::parse(trimmed).map_err(|e| MigrateError::invalid_url(raw, e.to_string()))?;

        let migrations_table = url
            .query_pairs()
            .find(|(key, _)| key == MIGRATIONS_TABLE_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MIGRATIONS_TABLE.to_string());

        if !is_valid_table_name(&migrations_table) {
            return Err(MigrateError::invalid_url(
                raw,
                format!(
                    "'{}' is not a valid migrations table name (letters, digits and underscores, optionally schema-qualified)",
                    migrations_table
                ),
            ));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            url,
            migrations_table,
        })
    }

    /// Lowercased URL scheme; selects the driver
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Name of the applied-version table
    pub fn migrations_table(&self) -> &str {
        &self.migrations_table
    }

    /// The URL as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Database name from the URL path, if any
    pub fn database(&self) -> Option<&str> {
        let path = self.url.path().trim_start_matches('/');
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// The URL with shift-specific query parameters removed, suitable for
    /// passing to the underlying client library
    pub fn connection_url(&self) -> String {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != MIGRATIONS_TABLE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut clean = self.url.clone();
        if kept.is_empty() {
            clean.set_query(None);
        } else {
            clean.query_pairs_mut().clear().extend_pairs(kept.iter());
        }
        clean.to_string()
    }
}

fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

/// Opens a driver for a parsed URL
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self, url: &DriverUrl) -> MigrateResult<Box<dyn Driver>>;
}

/// Thread-safe mapping from URL scheme to driver factory
#[derive(Default)]
pub struct DriverRegistry {
    factories: DashMap<String, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in drivers (`postgres`, `postgresql`, `memory`)
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let postgres: Arc<dyn DriverFactory> = Arc::new(crate::postgres::PostgresDriverFactory);
        registry.register_shared("postgres", postgres.clone());
        registry.register_shared("postgresql", postgres);
        registry.register("memory", crate::memory::MemoryDriverFactory);
        registry
    }

    /// Register a factory for a scheme, replacing any previous one
    pub fn register<F>(&self, scheme: &str, factory: F)
    where
        F: DriverFactory + 'static,
    {
        self.register_shared(scheme, Arc::new(factory));
    }

    /// Register an already shared factory
    pub fn register_shared(&self, scheme: &str, factory: Arc<dyn DriverFactory>) {
        let scheme = scheme.to_lowercase();
        if self.factories.insert(scheme.clone(), factory).is_some() {
            tracing::debug!("Replaced driver registration for scheme '{}'", scheme);
        }
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.factories.contains_key(&scheme.to_lowercase())
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.iter().map(|entry| entry.key().clone()).collect();
        schemes.sort();
        schemes
    }

    /// Parse `url` and open the driver registered for its scheme
    pub async fn open(&self, url: &str) -> MigrateResult<Box<dyn Driver>> {
        let url = DriverUrl::parse(url)?;
        let factory = self
            .factories
            .get(url.scheme())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MigrateError::UnknownDriver(url.scheme().to_string()))?;

        tracing::debug!(
            "Opening '{}' driver (migrations table: {})",
            url.scheme(),
            url.migrations_table()
        );
        factory.open(&url).await
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_migrations_table() {
        let url = DriverUrl::parse("postgres://user:pw@localhost:5432/app").unwrap();
        assert_eq!(url.scheme(), "postgres");
        assert_eq!(url.migrations_table(), DEFAULT_MIGRATIONS_TABLE);
        assert_eq!(url.database(), Some("app"));
    }

    #[test]
    fn test_migrations_table_override_is_stripped_from_connection_url() {
        let url = DriverUrl::parse(
            "postgres://localhost/app?sslmode=disable&x-migrations-table=audit.versions",
        )
        .unwrap();
        assert_eq!(url.migrations_table(), "audit.versions");
        assert_eq!(url.connection_url(), "postgres://localhost/app?sslmode=disable");

        let url = DriverUrl::parse("postgres://localhost/app?x-migrations-table=versions").unwrap();
        assert_eq!(url.connection_url(), "postgres://localhost/app");
    }

    #[test]
    fn test_invalid_urls_are_config_errors() {
        assert!(DriverUrl::parse("").unwrap_err().is_config());
        assert!(DriverUrl::parse("no scheme here").unwrap_err().is_config());
        let err = DriverUrl::parse("postgres://localhost/app?x-migrations-table=drop;table").unwrap_err();
        assert!(err.is_config());
        assert!(DriverUrl::parse("postgres://h/db?x-migrations-table=a.b.c").is_err());
    }

    #[test]
    fn test_table_name_rules() {
        assert!(is_valid_table_name("schema_migrations"));
        assert!(is_valid_table_name("public.SchemaMigrations"));
        assert!(is_valid_table_name("_v2"));
        assert!(!is_valid_table_name("2fast"));
        assert!(!is_valid_table_name("bad-name"));
        assert!(!is_valid_table_name(""));
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_rejected() {
        let registry = DriverRegistry::new();
        let err = registry.open("mysql://localhost/app").await.err().unwrap();
        assert!(matches!(err, MigrateError::UnknownDriver(ref scheme) if scheme == "mysql"));
    }

    #[tokio::test]
    async fn test_registered_scheme_opens_driver() {
        let registry = DriverRegistry::new();
        registry.register("memory", crate::memory::MemoryDriverFactory);
        assert!(registry.is_registered("MEMORY"));

        let driver = registry.open("memory://").await.unwrap();
        assert_eq!(driver.version().await.unwrap(), crate::version::Version::ZERO);
    }

    #[test]
    fn test_default_schemes() {
        let registry = DriverRegistry::with_defaults();
        assert_eq!(registry.schemes(), vec!["memory", "postgres", "postgresql"]);
    }
}
