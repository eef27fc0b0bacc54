//! In-memory driver
//!
//! Keeps the applied-version set in process. Used by tests and for dry runs
//! through `memory://` URLs.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::driver::Driver;
use crate::error::{MigrateError, MigrateResult};
use crate::registry::{DriverFactory, DriverUrl};
use crate::unit::{MigrationUnit, UnitRef};
use crate::version::{AppliedVersions, Direction, Version};

#[derive(Debug, Default)]
struct MemoryState {
    applied: BTreeSet<Version>,
    log: Vec<UnitRef>,
    fail_on: Option<UnitRef>,
    fail_versions: bool,
    closed: bool,
}

/// Driver holding applied versions in memory
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `versions` already applied
    pub fn with_applied<I>(versions: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let state = MemoryState {
            applied: versions.into_iter().map(Version).collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make `migrate` fail for one unit
    pub async fn fail_on(&self, unit: UnitRef) {
        self.state.lock().await.fail_on = Some(unit);
    }

    /// Make every read of the applied versions fail
    pub async fn fail_versions(&self) {
        self.state.lock().await.fail_versions = true;
    }

    /// Units applied so far, in application order
    pub async fn applied_log(&self) -> Vec<UnitRef> {
        self.state.lock().await.log.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn migrate(&self, unit: &MigrationUnit) -> MigrateResult<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(MigrateError::driver("memory driver is closed"));
        }

        let unit_ref = unit.unit_ref();
        if state.fail_on == Some(unit_ref) {
            return Err(MigrateError::driver(format!(
                "injected failure while applying {}",
                unit_ref
            )));
        }

        match unit.direction {
            Direction::Up => {
                if !state.applied.insert(unit.version) {
                    return Err(MigrateError::driver(format!(
                        "version {} is already recorded as applied",
                        unit.version
                    )));
                }
            }
            Direction::Down => {
                state.applied.remove(&unit.version);
            }
        }

        state.log.push(unit_ref);
        Ok(())
    }

    async fn versions(&self) -> MigrateResult<AppliedVersions> {
        let state = self.state.lock().await;
        if state.fail_versions {
            return Err(MigrateError::driver("injected failure while reading applied versions"));
        }
        Ok(state.applied.iter().copied().collect())
    }

    async fn close(&self) -> MigrateResult<()> {
        self.state.lock().await.closed = true;
        Ok(())
    }
}

/// Factory for `memory://` URLs
#[derive(Debug, Default)]
pub struct MemoryDriverFactory;

#[async_trait]
impl DriverFactory for MemoryDriverFactory {
    async fn open(&self, url: &DriverUrl) -> MigrateResult<Box<dyn Driver>> {
        tracing::debug!("Using in-memory driver for {}", url.as_str());
        Ok(Box::new(MemoryDriver::new()))
    }
}
