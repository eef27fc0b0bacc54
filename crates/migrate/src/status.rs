//! Migration status listing

use serde::Serialize;

use crate::store::UnitCatalog;
use crate::version::{AppliedVersions, Direction, Version};

/// One available version and its state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionStatus {
    pub version: Version,
    pub name: String,
    pub applied: bool,
    pub has_up: bool,
    pub has_down: bool,
}

/// Snapshot of available and applied versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub current: Version,
    pub versions: Vec<VersionStatus>,
    /// Applied versions with no migration files left
    pub orphaned: Vec<Version>,
}

impl StatusReport {
    pub fn build(catalog: &UnitCatalog, applied: &AppliedVersions) -> Self {
        let versions = catalog
            .versions()
            .into_iter()
            .map(|version| {
                let up = catalog
                    .in_direction(Direction::Up)
                    .find(|u| u.version == version);
                let down = catalog
                    .in_direction(Direction::Down)
                    .find(|u| u.version == version);
                let name = up
                    .or(down)
                    .map(|u| u.name.clone())
                    .unwrap_or_default();

                VersionStatus {
                    version,
                    name,
                    applied: applied.contains(version),
                    has_up: up.is_some(),
                    has_down: down.is_some(),
                }
            })
            .collect::<Vec<_>>();

        let orphaned = applied
            .iter()
            .filter(|v| !versions.iter().any(|s| s.version == *v))
            .collect();

        Self {
            current: applied.current(),
            versions,
            orphaned,
        }
    }

    /// Available versions not yet applied
    pub fn pending(&self) -> impl Iterator<Item = &VersionStatus> {
        self.versions.iter().filter(|s| !s.applied)
    }
}
