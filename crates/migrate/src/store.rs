//! File-store capability
//!
//! Discovers, creates and reads migration units. The engine never touches
//! the filesystem directly.

use async_trait::async_trait;

use crate::error::MigrateResult;
use crate::unit::{MigrationPair, MigrationUnit, UnitRef};
use crate::version::{Direction, Version};

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Every available unit, sorted by version then direction (Up first)
    async fn discover(&self) -> MigrateResult<Vec<MigrationUnit>>;

    /// Allocate the next version and produce an Up/Down pair named `name`
    async fn create(&self, name: &str, extension: &str) -> MigrateResult<MigrationPair>;

    /// Load a unit's raw instruction bytes
    async fn read_content(&self, unit: &MigrationUnit) -> MigrateResult<Vec<u8>>;
}

/// Discovered units with lookup helpers used for planning
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: Vec<MigrationUnit>,
}

impl UnitCatalog {
    /// Build from discovered units; re-sorts so callers need not trust the store
    pub fn new(mut units: Vec<MigrationUnit>) -> Self {
        units.sort_by(|a, b| (a.version, a.direction).cmp(&(b.version, b.direction)));
        Self { units }
    }

    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<MigrationUnit> {
        self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, unit: UnitRef) -> Option<&MigrationUnit> {
        self.units
            .binary_search_by(|u| (u.version, u.direction).cmp(&(unit.version, unit.direction)))
            .ok()
            .map(|idx| &self.units[idx])
    }

    pub fn contains(&self, unit: UnitRef) -> bool {
        self.get(unit).is_some()
    }

    /// Units of one direction, ascending by version
    pub fn in_direction(&self, direction: Direction) -> impl DoubleEndedIterator<Item = &MigrationUnit> + '_ {
        self.units.iter().filter(move |u| u.direction == direction)
    }

    /// Highest version with any unit, or zero
    pub fn max_version(&self) -> Version {
        self.units.last().map(|u| u.version).unwrap_or(Version::ZERO)
    }

    /// Distinct versions, ascending
    pub fn versions(&self) -> Vec<Version> {
        let mut versions: Vec<Version> = self.units.iter().map(|u| u.version).collect();
        versions.dedup();
        versions
    }
}
