//! # shift-core
//!
//! Shared configuration layer for the shift migration tool: environment
//! loading, command-line overrides and validation.

pub mod config;

pub use config::validation::ConfigError;
pub use config::{AppConfigTrait, ConfigSource, MigrateConfig};
