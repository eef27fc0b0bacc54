//! Cooperative cancellation
//!
//! The engine only ever reads a [`CancellationToken`], and only between
//! units. Turning operator interrupts into that token is the job of the
//! [`InterruptController`]: the first interrupt asks for a graceful stop
//! after the unit in flight, a second one asks for immediate termination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// A cancellation flag shared between the controller and the engine
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Interrupt handling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptState {
    /// No interrupt received
    Idle,
    /// Stop after the unit in flight
    StopRequested,
    /// Terminate now
    ForceTerminate,
}

/// What the caller should do after feeding an event to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Token canceled; the engine stops at the next unit boundary
    RequestStop,
    /// Terminate the process immediately
    ForceExit,
    /// The unit in flight during a stop request has finished
    Acknowledge,
    Ignore,
}

/// Two-phase interrupt state machine
#[derive(Debug)]
pub struct InterruptController {
    state: InterruptState,
    token: CancellationToken,
    acknowledged: bool,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            state: InterruptState::Idle,
            token,
            acknowledged: false,
        }
    }

    /// Token to hand to the engine
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn state(&self) -> InterruptState {
        self.state
    }

    /// Feed an external interrupt
    pub fn on_interrupt(&mut self) -> InterruptAction {
        match self.state {
            InterruptState::Idle => {
                self.state = InterruptState::StopRequested;
                self.token.cancel();
                InterruptAction::RequestStop
            }
            InterruptState::StopRequested | InterruptState::ForceTerminate => {
                self.state = InterruptState::ForceTerminate;
                InterruptAction::ForceExit
            }
        }
    }

    /// Feed a "unit completed" event
    pub fn on_unit_completed(&mut self) -> InterruptAction {
        match self.state {
            InterruptState::StopRequested if !self.acknowledged => {
                self.acknowledged = true;
                InterruptAction::Acknowledge
            }
            _ => InterruptAction::Ignore,
        }
    }

    /// Drive the state machine from two event sources
    ///
    /// Returns once a stop request is acknowledged, when a forced termination
    /// is requested, or when both sources are closed. The caller decides how
    /// to terminate.
    pub async fn run(
        mut self,
        mut interrupts: mpsc::Receiver<()>,
        mut completions: mpsc::UnboundedReceiver<()>,
    ) -> InterruptState {
        loop {
            tokio::select! {
                Some(()) = interrupts.recv() => match self.on_interrupt() {
                    InterruptAction::RequestStop => {
                        tracing::warn!("Aborting after this migration... Hit again to force quit.");
                    }
                    InterruptAction::ForceExit => {
                        tracing::warn!("Forced termination requested");
                        return self.state;
                    }
                    _ => {}
                },
                Some(()) = completions.recv() => {
                    if self.on_unit_completed() == InterruptAction::Acknowledge {
                        tracing::info!("In-flight migration finished; no further migrations will start");
                        return self.state;
                    }
                },
                else => return self.state,
            }
        }
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}
