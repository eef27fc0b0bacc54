use crate::config::{ConfigError, ConfigSource, ConfigValidator, DriverUrlValidator, LogFilterValidator};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable holding the driver URL
pub const DRIVER_URL_ENV: &str = "DRIVER_URL";
/// Environment variable holding the migration files directory
pub const FILES_PATH_ENV: &str = "FILES_PATH";
/// Environment variable holding the log filter directive
pub const LOG_FILTER_ENV: &str = "SHIFT_LOG";

/// Default migration files directory
pub const DEFAULT_FILES_PATH: &str = "./files";
/// Default log filter directive
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration trait for environment-driven configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Configuration for one migration run
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Driver connection URL; the scheme selects the driver
    pub driver_url: Option<String>,
    /// Directory holding migration files
    pub files_path: PathBuf,
    /// `tracing` filter directive
    pub log_filter: String,
    sources: HashMap<String, ConfigSource>,
}

impl MigrateConfig {
    /// Create a configuration holding only defaults
    pub fn new() -> Self {
        let mut sources = HashMap::new();
        sources.insert(
            "files_path".to_string(),
            ConfigSource::Default(DEFAULT_FILES_PATH.to_string()),
        );
        sources.insert(
            "log_filter".to_string(),
            ConfigSource::Default(DEFAULT_LOG_FILTER.to_string()),
        );

        Self {
            driver_url: None,
            files_path: PathBuf::from(DEFAULT_FILES_PATH),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            sources,
        }
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead of
    /// mutating the process environment. Values are not validated here, since
    /// command-line overrides may still replace them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(url) = lookup(DRIVER_URL_ENV).filter(|v| !v.is_empty()) {
            config.driver_url = Some(url);
            config.record("driver_url", ConfigSource::EnvVar(DRIVER_URL_ENV.to_string()));
        }

        if let Some(path) = lookup(FILES_PATH_ENV).filter(|v| !v.is_empty()) {
            config.files_path = PathBuf::from(path);
            config.record("files_path", ConfigSource::EnvVar(FILES_PATH_ENV.to_string()));
        }

        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|v| !v.is_empty()) {
            config.log_filter = filter;
            config.record("log_filter", ConfigSource::EnvVar(LOG_FILTER_ENV.to_string()));
        }

        Ok(config)
    }

    /// Override the driver URL from the `--url` flag
    pub fn with_driver_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.driver_url = Some(url);
            self.record("driver_url", ConfigSource::CommandLine("--url".to_string()));
        }
        self
    }

    /// Override the files directory from the `--path` flag
    pub fn with_files_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.files_path = path;
            self.record("files_path", ConfigSource::CommandLine("--path".to_string()));
        }
        self
    }

    /// Override the log filter from the `--log` flag
    pub fn with_log_filter(mut self, filter: Option<String>) -> Self {
        if let Some(filter) = filter {
            self.log_filter = filter;
            self.record("log_filter", ConfigSource::CommandLine("--log".to_string()));
        }
        self
    }

    /// The driver URL, or a configuration error when none was given
    pub fn require_driver_url(&self) -> Result<&str, ConfigError> {
        let url = self.driver_url.as_deref().ok_or_else(|| {
            ConfigError::missing_required(
                "driver_url",
                format!("Set {} or pass --url", DRIVER_URL_ENV),
            )
        })?;
        DriverUrlValidator.validate(url)?;
        Ok(url)
    }

    /// Migration files directory
    pub fn files_path(&self) -> &Path {
        &self.files_path
    }

    fn record(&mut self, field: &str, source: ConfigSource) {
        self.sources.insert(field.to_string(), source);
    }
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigTrait for MigrateConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.driver_url {
            DriverUrlValidator.validate(url)?;
        }

        if self.files_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                "files_path",
                "",
                "path to the migration files directory",
            ));
        }

        LogFilterValidator.validate(&self.log_filter)
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.clone()
    }
}
