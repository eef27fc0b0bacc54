//! Run reports - the outcome of one top-level operation

use std::fmt;

use crate::error::MigrateError;
use crate::unit::UnitRef;

/// How a run ended
#[derive(Debug)]
pub enum RunState {
    /// Every planned unit was applied
    Completed,
    /// Stopped cooperatively between units
    Canceled,
    /// A hook or the driver failed, or fewer units existed than requested
    Aborted(MigrateError),
}

impl RunState {
    pub fn label(&self) -> &'static str {
        match self {
            RunState::Completed => "completed",
            RunState::Canceled => "canceled",
            RunState::Aborted(err) if err.is_hook() => "aborted (hook)",
            RunState::Aborted(err) if err.is_driver() => "aborted (driver)",
            RunState::Aborted(_) => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Aborted(err) => write!(f, "{}: {}", self.label(), err),
            _ => f.write_str(self.label()),
        }
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct RunReport {
    /// Units that were applied, in order
    pub applied: Vec<UnitRef>,
    /// Terminal state
    pub state: RunState,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl RunReport {
    /// A run with nothing to do
    pub fn nothing_to_do() -> Self {
        Self {
            applied: Vec::new(),
            state: RunState::Completed,
            execution_time_ms: 0,
        }
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn last_applied(&self) -> Option<UnitRef> {
        self.applied.last().copied()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.state, RunState::Canceled)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.state, RunState::Aborted(_))
    }

    pub fn error(&self) -> Option<&MigrateError> {
        match &self.state {
            RunState::Aborted(err) => Some(err),
            _ => None,
        }
    }
}
