//! # shift-migrate: Versioned Schema Migration Engine
//!
//! Applies ordered, versioned migration units against a storage driver.
//! Each version carries an Up unit and usually a Down unit; the driver
//! records which versions are applied and the engine plans what to run.
//!
//! Drivers are opened from URLs through a [`DriverRegistry`]; migration
//! files come from a [`FileStore`] such as [`DirectoryStore`]. Runs can be
//! stopped between units through a [`CancellationToken`].

pub mod cancel;
pub mod driver;
pub mod engine;
pub mod error;
pub mod fs_store;
pub mod hooks;
pub mod memory;
pub mod plan;
pub mod postgres;
pub mod registry;
pub mod report;
pub mod status;
pub mod store;
pub mod unit;
pub mod version;

pub use cancel::{CancellationToken, InterruptAction, InterruptController, InterruptState};
pub use driver::{Driver, DEFAULT_FILE_EXTENSION};
pub use engine::MigrationEngine;
pub use error::{DriverError, MigrateError, MigrateResult};
pub use fs_store::DirectoryStore;
pub use hooks::{Hook, HookConfig, HookError, HookPhase};
pub use memory::{MemoryDriver, MemoryDriverFactory};
pub use postgres::{PostgresDriver, PostgresDriverFactory};
pub use registry::{DriverFactory, DriverRegistry, DriverUrl};
pub use report::{RunReport, RunState};
pub use status::{StatusReport, VersionStatus};
pub use store::{FileStore, UnitCatalog};
pub use unit::{MigrationPair, MigrationUnit, UnitRef};
pub use version::{AppliedVersions, Direction, Version};
