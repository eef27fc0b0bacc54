//! Version and direction value types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A migration point. Version zero means nothing has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// The "nothing applied" version
    pub const ZERO: Version = Version(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Version(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Version)
    }
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Apply the migration (run UP statements)
    Up,
    /// Reverse a prior Up (run DOWN statements)
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(format!("Unknown migration direction: {}", s)),
        }
    }
}

/// The versions a driver reports as applied, strictly increasing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedVersions(Vec<Version>);

impl AppliedVersions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from driver rows in any order; duplicates collapse
    pub fn from_unsorted<I>(versions: I) -> Self
    where
        I: IntoIterator<Item = Version>,
    {
        let mut versions: Vec<Version> = versions.into_iter().collect();
        versions.sort_unstable();
        versions.dedup();
        Self(versions)
    }

    /// Highest applied version, or zero when nothing is applied
    pub fn current(&self) -> Version {
        self.0.last().copied().unwrap_or(Version::ZERO)
    }

    pub fn contains(&self, version: Version) -> bool {
        self.0.binary_search(&version).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Version> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Version] {
        &self.0
    }
}

impl FromIterator<Version> for AppliedVersions {
    fn from_iter<I: IntoIterator<Item = Version>>(iter: I) -> Self {
        Self::from_unsorted(iter)
    }
}
