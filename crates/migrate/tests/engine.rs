//! End-to-end engine scenarios over a real migration directory

use std::fs;
use std::sync::{Arc, Mutex};

use shift_migrate::{
    CancellationToken, Direction, DirectoryStore, DriverRegistry, HookConfig, HookError,
    MemoryDriver, MigrateError, MigrationEngine, RunState, UnitRef, Version,
};
use tempfile::TempDir;

fn write_migrations(dir: &TempDir, versions: &[u64]) {
    for &v in versions {
        for direction in ["up", "down"] {
            let path = dir.path().join(format!("{:04}_step_{}.{}.sql", v, v, direction));
            fs::write(path, format!("-- {} {}", direction, v)).unwrap();
        }
    }
}

fn engine_with(
    dir: &TempDir,
    driver: &MemoryDriver,
    hooks: HookConfig,
) -> MigrationEngine<MemoryDriver, DirectoryStore> {
    MigrationEngine::new(driver.clone(), DirectoryStore::new(dir.path()), hooks)
}

#[tokio::test]
async fn test_up_from_zero_applies_everything() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::new();
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.up(&CancellationToken::new()).await.unwrap();

    assert!(report.is_completed());
    assert_eq!(
        report.applied,
        vec![UnitRef::up(1), UnitRef::up(2), UnitRef::up(3)]
    );
    assert_eq!(engine.version().await.unwrap(), Version(3));
}

#[tokio::test]
async fn test_up_at_latest_version_is_noop() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2]);
    let driver = MemoryDriver::with_applied([1, 2]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.up(&CancellationToken::new()).await.unwrap();

    assert!(report.is_completed());
    assert_eq!(report.applied_count(), 0);
    assert!(driver.applied_log().await.is_empty());
}

#[tokio::test]
async fn test_down_to_zero() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::with_applied([1, 2, 3]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.down(&CancellationToken::new()).await.unwrap();

    assert!(report.is_completed());
    assert_eq!(
        report.applied,
        vec![UnitRef::down(3), UnitRef::down(2), UnitRef::down(1)]
    );
    assert_eq!(engine.version().await.unwrap(), Version::ZERO);
}

#[tokio::test]
async fn test_down_without_down_unit_fails_before_running() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1]);
    fs::write(dir.path().join("0002_only_up.up.sql"), "-- up 2").unwrap();
    let driver = MemoryDriver::with_applied([1, 2]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let err = engine.down(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        MigrateError::NotFound { version: Version(2), direction: Direction::Down }
    ));
    assert!(driver.applied_log().await.is_empty());
}

#[tokio::test]
async fn test_migrate_back_two() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3, 4, 5]);
    let driver = MemoryDriver::with_applied([1, 2, 3]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.migrate(-2, &CancellationToken::new()).await.unwrap();

    assert!(report.is_completed());
    assert_eq!(report.applied, vec![UnitRef::down(3), UnitRef::down(2)]);
    assert_eq!(engine.version().await.unwrap(), Version(1));
}

#[tokio::test]
async fn test_goto_forward_matches_relative_migrate() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3, 4, 5]);

    let goto_driver = MemoryDriver::with_applied([1, 2]);
    let goto_engine = engine_with(&dir, &goto_driver, HookConfig::new());
    let via_goto = goto_engine.goto(5, &CancellationToken::new()).await.unwrap();

    let relative_driver = MemoryDriver::with_applied([1, 2]);
    let relative_engine = engine_with(&dir, &relative_driver, HookConfig::new());
    let via_migrate = relative_engine
        .migrate(3, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        via_goto.applied,
        vec![UnitRef::up(3), UnitRef::up(4), UnitRef::up(5)]
    );
    assert_eq!(via_goto.applied, via_migrate.applied);
    assert_eq!(goto_engine.version().await.unwrap(), Version(5));
}

#[tokio::test]
async fn test_migrate_forward_then_back_returns_to_start() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3, 4, 5]);
    let driver = MemoryDriver::with_applied([1]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let forward = engine.migrate(3, &CancellationToken::new()).await.unwrap();
    assert!(forward.is_completed());
    assert_eq!(engine.version().await.unwrap(), Version(4));

    let back = engine.migrate(-3, &CancellationToken::new()).await.unwrap();
    assert!(back.is_completed());
    assert_eq!(
        back.applied,
        vec![UnitRef::down(4), UnitRef::down(3), UnitRef::down(2)]
    );
    assert_eq!(engine.version().await.unwrap(), Version(1));
}

#[tokio::test]
async fn test_goto_backward_rolls_back() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::with_applied([1, 2, 3]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.goto(1, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.applied, vec![UnitRef::down(3), UnitRef::down(2)]);
    assert_eq!(engine.version().await.unwrap(), Version(1));
}

#[tokio::test]
async fn test_apply_missing_version_touches_nothing() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2]);
    let driver = MemoryDriver::new();
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let err = engine
        .apply_version(10, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MigrateError::NotFound { version: Version(10), direction: Direction::Up }
    ));
    assert!(driver.applied_log().await.is_empty());
}

#[tokio::test]
async fn test_apply_and_rollback_single_versions() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::new();
    let engine = engine_with(&dir, &driver, HookConfig::new());
    let cancel = CancellationToken::new();

    let report = engine.apply_version(2, &cancel).await.unwrap();
    assert_eq!(report.applied, vec![UnitRef::up(2)]);
    assert_eq!(engine.version().await.unwrap(), Version(2));

    let report = engine.rollback_version(2, &cancel).await.unwrap();
    assert_eq!(report.applied, vec![UnitRef::down(2)]);
    assert_eq!(engine.version().await.unwrap(), Version::ZERO);
}

#[tokio::test]
async fn test_cancel_after_second_unit() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3, 4, 5]);
    let driver = MemoryDriver::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let hooks = HookConfig::new().after(move |unit| {
        if unit.version == Version(2) {
            trigger.cancel();
        }
        Ok(())
    });
    let engine = engine_with(&dir, &driver, hooks);

    let report = engine.up(&cancel).await.unwrap();

    assert!(report.is_canceled());
    assert_eq!(report.applied, vec![UnitRef::up(1), UnitRef::up(2)]);
    assert_eq!(engine.version().await.unwrap(), Version(2));
}

#[tokio::test]
async fn test_cancel_before_start_applies_nothing() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2]);
    let driver = MemoryDriver::new();
    let engine = engine_with(&dir, &driver, HookConfig::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = engine.up(&cancel).await.unwrap();

    assert!(report.is_canceled());
    assert!(report.applied.is_empty());
    assert!(driver.applied_log().await.is_empty());
}

#[tokio::test]
async fn test_pre_hook_failure_stops_at_that_unit() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::new();
    let hooks = HookConfig::new().before(|unit| {
        if unit.version == Version(2) {
            Err(HookError::new("schema freeze"))
        } else {
            Ok(())
        }
    });
    let engine = engine_with(&dir, &driver, hooks);

    let report = engine.up(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.applied, vec![UnitRef::up(1)]);
    assert_eq!(report.state.label(), "aborted (hook)");
    assert!(matches!(
        report.error(),
        Some(MigrateError::Hook { unit, .. }) if *unit == UnitRef::up(2)
    ));
    assert_eq!(engine.version().await.unwrap(), Version(1));
}

#[tokio::test]
async fn test_post_hook_failure_keeps_unit_applied() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::new();
    let hooks = HookConfig::new().after(|unit| {
        if unit.version == Version(2) {
            Err(HookError::new("notification failed"))
        } else {
            Ok(())
        }
    });
    let engine = engine_with(&dir, &driver, hooks);

    let report = engine.up(&CancellationToken::new()).await.unwrap();

    assert!(report.is_aborted());
    assert_eq!(report.applied, vec![UnitRef::up(1), UnitRef::up(2)]);
    assert_eq!(engine.version().await.unwrap(), Version(2));
}

#[tokio::test]
async fn test_driver_failure_aborts_without_rollback() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::new();
    driver.fail_on(UnitRef::up(3)).await;
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.up(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.state.label(), "aborted (driver)");
    assert_eq!(report.last_applied(), Some(UnitRef::up(2)));
    assert_eq!(engine.version().await.unwrap(), Version(2));
}

#[tokio::test]
async fn test_unreadable_versions_fail_every_operation_before_running() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::with_applied([1]);
    driver.fail_versions().await;
    let engine = engine_with(&dir, &driver, HookConfig::new());
    let cancel = CancellationToken::new();

    assert!(engine.up(&cancel).await.unwrap_err().is_driver());
    assert!(engine.down(&cancel).await.unwrap_err().is_driver());
    assert!(engine.migrate(2, &cancel).await.unwrap_err().is_driver());
    assert!(engine.migrate(-1, &cancel).await.unwrap_err().is_driver());
    assert!(engine.goto(3, &cancel).await.unwrap_err().is_driver());
    assert!(engine.redo(&cancel).await.unwrap_err().is_driver());
    assert!(engine.status().await.unwrap_err().is_driver());
    assert!(driver.applied_log().await.is_empty());
}

#[tokio::test]
async fn test_migrate_shortfall_applies_what_exists() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2, 3]);
    let driver = MemoryDriver::with_applied([1]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.migrate(5, &CancellationToken::new()).await.unwrap();

    assert_eq!(report.applied, vec![UnitRef::up(2), UnitRef::up(3)]);
    assert!(matches!(
        report.error(),
        Some(MigrateError::InsufficientUnits { requested: 5, available: 2, .. })
    ));
    assert_eq!(engine.version().await.unwrap(), Version(3));
}

#[tokio::test]
async fn test_redo_rolls_back_and_reapplies_current() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2]);
    let driver = MemoryDriver::with_applied([1, 2]);
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let report = engine.redo(&CancellationToken::new()).await.unwrap();

    assert!(report.is_completed());
    assert_eq!(report.applied, vec![UnitRef::down(2), UnitRef::up(2)]);
    assert_eq!(engine.version().await.unwrap(), Version(2));

    let empty = MemoryDriver::new();
    let engine = engine_with(&dir, &empty, HookConfig::new());
    let report = engine.reset(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.applied_count(), 0);
}

#[tokio::test]
async fn test_hooks_run_in_registration_order() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1]);
    let driver = MemoryDriver::new();
    let events = Arc::new(Mutex::new(Vec::new()));

    let (first, second, third) = (events.clone(), events.clone(), events.clone());
    let hooks = HookConfig::new()
        .before(move |_| {
            first.lock().unwrap().push("pre-1");
            Ok(())
        })
        .before(move |_| {
            second.lock().unwrap().push("pre-2");
            Ok(())
        })
        .after(move |_| {
            third.lock().unwrap().push("post-1");
            Ok(())
        });
    let engine = engine_with(&dir, &driver, hooks);

    engine.up(&CancellationToken::new()).await.unwrap();

    assert_eq!(*events.lock().unwrap(), vec!["pre-1", "pre-2", "post-1"]);
}

#[tokio::test]
async fn test_create_then_status() {
    let dir = TempDir::new().unwrap();
    let driver = MemoryDriver::new();
    let engine = engine_with(&dir, &driver, HookConfig::new());

    let pair = engine.create("create users").await.unwrap();
    assert_eq!(pair.version, Version(1));
    assert!(dir.path().join("0001_create_users.up.sql").exists());

    engine.create("add_email").await.unwrap();
    engine.apply_version(1, &CancellationToken::new()).await.unwrap();

    let status = engine.status().await.unwrap();
    assert_eq!(status.current, Version(1));
    assert_eq!(status.versions.len(), 2);
    assert!(status.versions[0].applied);
    assert!(!status.versions[1].applied);
    assert_eq!(status.versions[1].name, "add_email");
}

#[tokio::test]
async fn test_open_through_registry() {
    let dir = TempDir::new().unwrap();
    write_migrations(&dir, &[1, 2]);
    let registry = DriverRegistry::with_defaults();

    let engine = MigrationEngine::open(
        &registry,
        "memory://dry-run",
        DirectoryStore::new(dir.path()),
        HookConfig::new(),
    )
    .await
    .unwrap();

    let report = engine.up(&CancellationToken::new()).await.unwrap();
    assert!(matches!(report.state, RunState::Completed));
    assert_eq!(engine.version().await.unwrap(), Version(2));
    engine.close().await.unwrap();

    let err = MigrationEngine::open(
        &registry,
        "mysql://localhost/db",
        DirectoryStore::new(dir.path()),
        HookConfig::new(),
    )
    .await
    .err()
    .expect("unregistered scheme must be rejected");
    assert!(err.is_config());
}
