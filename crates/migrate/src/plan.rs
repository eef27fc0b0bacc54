//! Work-list planning
//!
//! Turns the driver's applied state and the store's catalog into the ordered
//! list of units an operation will apply. Planning never touches the driver
//! or the store, so every rule here is checked before the first unit runs.

use crate::error::{MigrateError, MigrateResult};
use crate::store::UnitCatalog;
use crate::unit::UnitRef;
use crate::version::{AppliedVersions, Direction, Version};

/// Fewer units existed than a relative migration asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub direction: Direction,
    pub requested: u64,
    pub available: u64,
}

impl Shortfall {
    pub fn into_error(self) -> MigrateError {
        MigrateError::InsufficientUnits {
            direction: self.direction,
            requested: self.requested,
            available: self.available,
        }
    }
}

/// Ordered units to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<UnitRef>,
    pub shortfall: Option<Shortfall>,
}

impl Plan {
    pub fn new(steps: Vec<UnitRef>) -> Self {
        Self { steps, shortfall: None }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Every Up unit above `current`, ascending
pub fn plan_up(catalog: &UnitCatalog, current: Version) -> Plan {
    Plan::new(pending_ups(catalog, current).collect())
}

/// Down units for every applied version, descending
pub fn plan_down(catalog: &UnitCatalog, applied: &AppliedVersions) -> MigrateResult<Plan> {
    let steps = downs_for(catalog, applied.iter().rev())?;
    Ok(Plan::new(steps))
}

/// `n` units relative to the current state
///
/// Positive `n` takes the next pending Up units, negative `n` the Down units
/// of the most recently applied versions. When fewer exist the plan holds
/// all of them and records the shortfall.
pub fn plan_relative(
    catalog: &UnitCatalog,
    current: Version,
    applied: &AppliedVersions,
    n: i64,
) -> MigrateResult<Plan> {
    let requested = n.unsigned_abs();

    let (direction, steps) = match n {
        0 => return Ok(Plan::empty()),
        n if n > 0 => {
            let steps: Vec<UnitRef> = pending_ups(catalog, current)
                .take(usize::try_from(requested).unwrap_or(usize::MAX))
                .collect();
            (Direction::Up, steps)
        }
        _ => {
            let versions = applied
                .iter()
                .rev()
                .take(usize::try_from(requested).unwrap_or(usize::MAX));
            (Direction::Down, downs_for(catalog, versions)?)
        }
    };

    let available = steps.len() as u64;
    let shortfall = (available < requested).then_some(Shortfall {
        direction,
        requested,
        available,
    });

    Ok(Plan { steps, shortfall })
}

/// Exactly one unit, which must exist in the catalog
pub fn plan_single(catalog: &UnitCatalog, unit: UnitRef) -> MigrateResult<Plan> {
    if !catalog.contains(unit) {
        return Err(MigrateError::not_found(unit));
    }
    Ok(Plan::new(vec![unit]))
}

/// Down then Up for the current version; empty at version zero
pub fn plan_redo(catalog: &UnitCatalog, current: Version) -> MigrateResult<Plan> {
    if current.is_zero() {
        return Ok(Plan::empty());
    }

    let steps = vec![UnitRef::down(current), UnitRef::up(current)];
    if let Some(missing) = steps.iter().find(|unit| !catalog.contains(**unit)) {
        return Err(MigrateError::not_found(*missing));
    }
    Ok(Plan::new(steps))
}

fn pending_ups(catalog: &UnitCatalog, current: Version) -> impl Iterator<Item = UnitRef> + '_ {
    catalog
        .in_direction(Direction::Up)
        .filter(move |unit| unit.version > current)
        .map(|unit| unit.unit_ref())
}

fn downs_for<I>(catalog: &UnitCatalog, versions: I) -> MigrateResult<Vec<UnitRef>>
where
    I: Iterator<Item = Version>,
{
    versions
        .map(|version| {
            let unit = UnitRef::down(version);
            if catalog.contains(unit) {
                Ok(unit)
            } else {
                Err(MigrateError::not_found(unit))
            }
        })
        .collect()
}
