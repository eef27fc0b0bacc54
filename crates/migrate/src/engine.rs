//! Migration engine - plans and runs units against a driver
//!
//! Every operation that runs units follows the same loop: check the
//! cancellation token, run pre-hooks, load the unit's content, hand it to
//! the driver, record it, run post-hooks. Units run strictly one after the
//! other and a failure ends the run without compensating rollback.

use std::time::Instant;

use crate::cancel::CancellationToken;
use crate::driver::Driver;
use crate::error::{MigrateError, MigrateResult};
use crate::hooks::{HookConfig, HookPhase};
use crate::plan::{self, Plan};
use crate::registry::DriverRegistry;
use crate::report::{RunReport, RunState};
use crate::status::StatusReport;
use crate::store::{FileStore, UnitCatalog};
use crate::unit::{MigrationPair, MigrationUnit, UnitRef};
use crate::version::{AppliedVersions, Direction, Version};

/// Orchestrates one driver and one file store
#[derive(Debug)]
pub struct MigrationEngine<D, F> {
    driver: D,
    store: F,
    hooks: HookConfig,
}

impl<F: FileStore> MigrationEngine<Box<dyn Driver>, F> {
    /// Open the driver registered for the URL's scheme
    pub async fn open(
        registry: &DriverRegistry,
        url: &str,
        store: F,
        hooks: HookConfig,
    ) -> MigrateResult<Self> {
        let driver = registry.open(url).await?;
        Ok(Self::new(driver, store, hooks))
    }
}

impl<D: Driver, F: FileStore> MigrationEngine<D, F> {
    pub fn new(driver: D, store: F, hooks: HookConfig) -> Self {
        Self {
            driver,
            store,
            hooks,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    pub fn hooks(&self) -> &HookConfig {
        &self.hooks
    }

    /// Apply every pending Up unit
    pub async fn up(&self, cancel: &CancellationToken) -> MigrateResult<RunReport> {
        let current = self.driver.version().await?;
        let catalog = self.catalog().await?;
        let plan = plan::plan_up(&catalog, current);
        Ok(self.run(&catalog, plan, cancel).await)
    }

    /// Roll back every applied version, newest first
    pub async fn down(&self, cancel: &CancellationToken) -> MigrateResult<RunReport> {
        let applied = self.driver.versions().await?;
        let catalog = self.catalog().await?;
        let plan = plan::plan_down(&catalog, &applied)?;
        Ok(self.run(&catalog, plan, cancel).await)
    }

    /// Apply `n` units relative to the current version
    ///
    /// Positive `n` goes up, negative `n` rolls back. When fewer units exist
    /// than requested, all of them are applied and the run ends aborted with
    /// [`MigrateError::InsufficientUnits`].
    pub async fn migrate(&self, n: i64, cancel: &CancellationToken) -> MigrateResult<RunReport> {
        if n == 0 {
            return Ok(RunReport::nothing_to_do());
        }

        let current = self.driver.version().await?;
        let applied = self.driver.versions().await?;
        let catalog = self.catalog().await?;
        let plan = plan::plan_relative(&catalog, current, &applied, n)?;
        Ok(self.run(&catalog, plan, cancel).await)
    }

    /// Apply the Up unit of one version
    pub async fn apply_version(
        &self,
        version: impl Into<Version>,
        cancel: &CancellationToken,
    ) -> MigrateResult<RunReport> {
        self.run_single(UnitRef::new(version, Direction::Up), cancel)
            .await
    }

    /// Apply the Down unit of one version
    pub async fn rollback_version(
        &self,
        version: impl Into<Version>,
        cancel: &CancellationToken,
    ) -> MigrateResult<RunReport> {
        self.run_single(UnitRef::new(version, Direction::Down), cancel)
            .await
    }

    /// Roll back the current version and apply it again
    pub async fn redo(&self, cancel: &CancellationToken) -> MigrateResult<RunReport> {
        let current = self.driver.version().await?;
        let catalog = self.catalog().await?;
        let plan = plan::plan_redo(&catalog, current)?;
        Ok(self.run(&catalog, plan, cancel).await)
    }

    /// Same as [`redo`](Self::redo)
    pub async fn reset(&self, cancel: &CancellationToken) -> MigrateResult<RunReport> {
        self.redo(cancel).await
    }

    /// Migrate to an absolute version
    pub async fn goto(
        &self,
        target: impl Into<Version>,
        cancel: &CancellationToken,
    ) -> MigrateResult<RunReport> {
        let target = target.into();
        let current = self.driver.version().await?;
        let delta = i128::from(target.get()) - i128::from(current.get());
        let delta = i64::try_from(delta).map_err(|_| {
            MigrateError::Unsupported(format!(
                "cannot move from version {} to {} in one run",
                current, target
            ))
        })?;

        tracing::debug!("goto {}: current {}, delta {}", target, current, delta);
        self.migrate(delta, cancel).await
    }

    /// Current applied version
    pub async fn version(&self) -> MigrateResult<Version> {
        self.driver.version().await
    }

    /// All applied versions
    pub async fn versions(&self) -> MigrateResult<AppliedVersions> {
        self.driver.versions().await
    }

    /// Create the next Up/Down pair in the file store
    pub async fn create(&self, name: &str) -> MigrateResult<MigrationPair> {
        self.store.create(name, self.driver.file_extension()).await
    }

    /// Available versions with their applied state
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        let applied = self.driver.versions().await?;
        let catalog = self.catalog().await?;
        Ok(StatusReport::build(&catalog, &applied))
    }

    /// Release the driver
    pub async fn close(&self) -> MigrateResult<()> {
        self.driver.close().await
    }

    async fn catalog(&self) -> MigrateResult<UnitCatalog> {
        let units = self.store.discover().await?;
        tracing::debug!("Discovered {} migration unit(s)", units.len());
        Ok(UnitCatalog::new(units))
    }

    async fn run_single(
        &self,
        unit: UnitRef,
        cancel: &CancellationToken,
    ) -> MigrateResult<RunReport> {
        let catalog = self.catalog().await?;
        let plan = plan::plan_single(&catalog, unit)?;
        Ok(self.run(&catalog, plan, cancel).await)
    }

    async fn run(&self, catalog: &UnitCatalog, plan: Plan, cancel: &CancellationToken) -> RunReport {
        let start_time = Instant::now();

        if plan.is_empty() && plan.shortfall.is_none() {
            tracing::info!("No migrations to apply");
            return RunReport::nothing_to_do();
        }

        tracing::debug!("Planned {} migration unit(s)", plan.len());

        let mut applied = Vec::with_capacity(plan.len());
        let mut state = RunState::Completed;

        for step in &plan.steps {
            if cancel.is_cancelled() {
                tracing::warn!("Stopping before {}: cancellation requested", step);
                state = RunState::Canceled;
                break;
            }

            let unit = match catalog.get(*step) {
                Some(unit) => unit.clone(),
                None => {
                    state = RunState::Aborted(MigrateError::not_found(*step));
                    break;
                }
            };

            if let Err(err) = self.apply_unit(unit, &mut applied).await {
                state = RunState::Aborted(err);
                break;
            }
        }

        if let (RunState::Completed, Some(shortfall)) = (&state, plan.shortfall) {
            state = RunState::Aborted(shortfall.into_error());
        }

        RunReport {
            applied,
            state,
            execution_time_ms: start_time.elapsed().as_millis(),
        }
    }

    async fn apply_unit(
        &self,
        mut unit: MigrationUnit,
        applied: &mut Vec<UnitRef>,
    ) -> MigrateResult<()> {
        self.run_hooks(HookPhase::Pre, &unit)?;

        let content = self.store.read_content(&unit).await?;
        unit.content = Some(content);

        let started = Instant::now();
        self.driver.migrate(&unit).await?;
        tracing::info!("Applied {} in {}ms", unit, started.elapsed().as_millis());

        applied.push(unit.unit_ref());
        self.run_hooks(HookPhase::Post, &unit)
    }

    fn run_hooks(&self, phase: HookPhase, unit: &MigrationUnit) -> MigrateResult<()> {
        for hook in self.hooks.hooks(phase) {
            hook(unit).map_err(|err| MigrateError::Hook {
                phase,
                unit: unit.unit_ref(),
                message: err.0,
            })?;
        }
        Ok(())
    }
}
