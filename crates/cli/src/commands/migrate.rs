use anyhow::{Context, Result};
use shift_core::MigrateConfig;
use shift_migrate::{
    CancellationToken, DirectoryStore, Driver, DriverRegistry, FileStore, HookConfig,
    InterruptController, MigrateError, MigrateResult, MigrationEngine, RunReport, RunState,
    StatusReport, Version, DEFAULT_FILE_EXTENSION,
};
use tokio::sync::mpsc;

use crate::interrupt;

type Engine = MigrationEngine<Box<dyn Driver>, DirectoryStore>;

/// A unit-running migrate subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Up,
    Down,
    Reset,
    Redo,
    Relative(i64),
    Apply(u64),
    Rollback(u64),
    Goto(u64),
}

impl Operation {
    async fn execute<D, F>(
        self,
        engine: &MigrationEngine<D, F>,
        cancel: &CancellationToken,
    ) -> MigrateResult<RunReport>
    where
        D: Driver,
        F: FileStore,
    {
        match self {
            Operation::Up => engine.up(cancel).await,
            Operation::Down => engine.down(cancel).await,
            Operation::Reset => engine.reset(cancel).await,
            Operation::Redo => engine.redo(cancel).await,
            Operation::Relative(n) => engine.migrate(n, cancel).await,
            Operation::Apply(version) => engine.apply_version(version, cancel).await,
            Operation::Rollback(version) => engine.rollback_version(version, cancel).await,
            Operation::Goto(version) => engine.goto(version, cancel).await,
        }
    }
}

async fn open_engine(config: &MigrateConfig, hooks: HookConfig) -> Result<Engine> {
    let url = config.require_driver_url().map_err(MigrateError::from)?;
    let registry = DriverRegistry::with_defaults();
    let store = DirectoryStore::new(config.files_path());

    MigrationEngine::open(&registry, url, store, hooks)
        .await
        .context("Failed to open migration driver")
}

/// Create the next Up/Down pair
///
/// Works without a driver URL; the default extension is used then.
pub async fn create(config: &MigrateConfig, words: &[String]) -> Result<()> {
    let name = words.join("_");

    let pair = match config.driver_url {
        Some(_) => {
            let engine = open_engine(config, HookConfig::new()).await?;
            let pair = engine.create(&name).await;
            engine.close().await?;
            pair?
        }
        None => {
            DirectoryStore::new(config.files_path())
                .create(&name, DEFAULT_FILE_EXTENSION)
                .await?
        }
    };

    println!("Created migration {} ({})", pair.version, pair.name);
    println!("  {}", pair.up.source);
    println!("  {}", pair.down.source);
    Ok(())
}

/// Print the current version
pub async fn version(config: &MigrateConfig) -> Result<()> {
    let engine = open_engine(config, HookConfig::new()).await?;
    let version = engine.version().await;
    engine.close().await?;

    println!("{}", version?);
    Ok(())
}

/// Print available versions and their applied state
pub async fn status(config: &MigrateConfig, json: bool) -> Result<()> {
    let engine = open_engine(config, HookConfig::new()).await?;
    let status = engine.status().await;
    engine.close().await?;
    let status = status?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &StatusReport) {
    println!("Migration Status (current version {}):", status.current);

    if status.versions.is_empty() && status.orphaned.is_empty() {
        println!("  No migrations found");
        return;
    }

    for entry in &status.versions {
        let mark = if entry.applied { "x" } else { " " };
        let mut notes = Vec::new();
        if !entry.has_up {
            notes.push("no up");
        }
        if !entry.has_down {
            notes.push("no down");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        println!("  [{}] {:>6} {}{}", mark, entry.version, entry.name, notes);
    }

    for version in &status.orphaned {
        println!("  [!] {:>6} applied, but no migration files found", version);
    }

    let pending = status.pending().count();
    println!(
        "{} applied, {} pending",
        status.versions.len() - pending,
        pending
    );
}

/// Run a unit-running operation with Ctrl-C handling
///
/// Returns `Ok(true)` only when every planned unit was applied.
pub async fn run(config: &MigrateConfig, operation: Operation) -> Result<bool> {
    let controller = InterruptController::new();
    let cancel = controller.token();
    let (interrupt_tx, interrupt_rx) = mpsc::channel(4);
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    let hooks = HookConfig::new()
        .before(|unit| {
            tracing::info!("Applying {}", unit);
            Ok(())
        })
        .after(move |_| {
            let _ = done_tx.send(());
            Ok(())
        });

    let engine = open_engine(config, hooks).await?;

    let supervisor = interrupt::supervise(controller, interrupt_rx, done_rx);
    let forwarder = interrupt::forward_ctrl_c(interrupt_tx);

    let outcome = operation.execute(&engine, &cancel).await;

    forwarder.abort();
    supervisor.abort();

    let (result, _) = finish(&engine, outcome).await;
    result
}

/// Log how the run ended and the version it left behind, then release the driver
///
/// The current version is reported even when the operation never started.
async fn finish<D, F>(
    engine: &MigrationEngine<D, F>,
    outcome: MigrateResult<RunReport>,
) -> (Result<bool>, Option<Version>)
where
    D: Driver,
    F: FileStore,
{
    let result = match outcome {
        Ok(report) => {
            log_report(&report);
            Ok(report.is_completed())
        }
        Err(err) => {
            tracing::error!("Migration failed before any unit ran: {}", err);
            Err(err)
        }
    };

    let current = log_current_version(engine).await;

    if let Err(close_err) = engine.close().await {
        tracing::warn!("Failed to close driver: {}", close_err);
        if result.is_ok() {
            return (Err(close_err.into()), current);
        }
    }

    (result.map_err(Into::into), current)
}

fn log_report(report: &RunReport) {
    match &report.state {
        RunState::Completed => tracing::info!(
            "Migration completed: {} unit(s) applied in {}ms",
            report.applied_count(),
            report.execution_time_ms
        ),
        RunState::Canceled => tracing::warn!(
            "Migration canceled after {} unit(s)",
            report.applied_count()
        ),
        RunState::Aborted(err) => tracing::error!(
            "Migration {} after {} unit(s): {}",
            report.state.label(),
            report.applied_count(),
            err
        ),
    }
}

async fn log_current_version<D, F>(engine: &MigrationEngine<D, F>) -> Option<Version>
where
    D: Driver,
    F: FileStore,
{
    match engine.version().await {
        Ok(version) => {
            tracing::info!("done: current-version {}", version);
            Some(version)
        }
        Err(err) => {
            tracing::error!("Failed to read current version: {}", err);
            None
        }
    }
}
