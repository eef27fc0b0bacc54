//! Ctrl-C handling for unit-running commands

use shift_migrate::{InterruptController, InterruptState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Process exit status after a forced termination
pub const FORCE_EXIT_CODE: i32 = 5;

/// Forward every Ctrl-C into the controller's interrupt channel
///
/// Once the controller has stopped listening, a further Ctrl-C terminates
/// the process.
pub fn forward_ctrl_c(interrupts: mpsc::Sender<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupts.send(()).await.is_err() {
                tracing::warn!("Interrupted again, terminating");
                std::process::exit(FORCE_EXIT_CODE);
            }
        }
    })
}

/// Drive the controller and exit the process on forced termination
pub fn supervise(
    controller: InterruptController,
    interrupts: mpsc::Receiver<()>,
    completions: mpsc::UnboundedReceiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if controller.run(interrupts, completions).await == InterruptState::ForceTerminate {
            std::process::exit(FORCE_EXIT_CODE);
        }
    })
}
