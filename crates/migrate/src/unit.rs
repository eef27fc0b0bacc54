//! Migration Units - one directional migration file tied to a version

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::{Direction, Version};

/// Identity of a unit: the version it belongs to and its direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRef {
    pub version: Version,
    pub direction: Direction,
}

impl UnitRef {
    pub fn new(version: impl Into<Version>, direction: Direction) -> Self {
        Self {
            version: version.into(),
            direction,
        }
    }

    pub fn up(version: impl Into<Version>) -> Self {
        Self::new(version, Direction::Up)
    }

    pub fn down(version: impl Into<Version>) -> Self {
        Self::new(version, Direction::Down)
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.version)
    }
}

/// A single migration unit
///
/// `content` stays `None` until the engine reads it from the file store,
/// right before handing the unit to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// Version this unit belongs to
    pub version: Version,
    /// Human-readable label
    pub name: String,
    /// Up or Down
    pub direction: Direction,
    /// Store-specific locator (a file path for the directory store)
    pub source: String,
    /// Raw instruction bytes, loaded on demand
    pub content: Option<Vec<u8>>,
}

impl MigrationUnit {
    pub fn new(
        version: impl Into<Version>,
        name: impl Into<String>,
        direction: Direction,
        source: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            name: name.into(),
            direction,
            source: source.into(),
            content: None,
        }
    }

    pub fn unit_ref(&self) -> UnitRef {
        UnitRef::new(self.version, self.direction)
    }

    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    /// Loaded content, if any
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Loaded content as UTF-8 text
    pub fn content_str(&self) -> Option<Result<&str, std::str::Utf8Error>> {
        self.content.as_deref().map(std::str::from_utf8)
    }
}

impl fmt::Display for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} migration for version {} ({})", self.direction, self.version, self.name)
    }
}

/// The Up/Down pair for one version, as produced by `FileStore::create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPair {
    pub version: Version,
    pub name: String,
    pub up: MigrationUnit,
    pub down: MigrationUnit,
}
