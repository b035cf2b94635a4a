//! Runs the user's command once per change burst.
//!
//! The command runs on its own task so a slow command never stalls the
//! IMAP session. The queue holds one request: bursts arriving while the
//! command runs collapse into a single follow-up run.

use std::process::ExitStatus;

use tokio::process::Command;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ActionError;

/// Background runner for the external action.
#[derive(Debug)]
pub struct ActionRunner {
    tx: mpsc::Sender<()>,
    worker: JoinHandle<()>,
}

impl ActionRunner {
    /// Spawns the worker task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(command: String) -> Self {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let worker = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match run_command(&command).await {
                    Ok(status) => debug!(%status, "Action finished"),
                    Err(err) => warn!(error = %err, "Action failed"),
                }
            }
        });
        Self { tx, worker }
    }

    /// Requests a run. Returns false if a run is already queued and this
    /// request was merged into it.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("Action already queued, coalescing");
                false
            }
            Err(TrySendError::Closed(())) => {
                warn!("Action worker has stopped");
                false
            }
        }
    }

    /// Waits for the queued and running actions to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(err) = self.worker.await {
            warn!(error = %err, "Action worker panicked");
        }
    }
}

/// Runs `command` through `sh -c`, inheriting stdio.
///
/// # Errors
///
/// Returns an error if the shell cannot be started or the command exits
/// unsuccessfully.
pub async fn run_command(command: &str) -> Result<ExitStatus, ActionError> {
    info!(%command, "Running action");
    let status = Command::new("sh").arg("-c").arg(command).status().await?;
    if status.success() {
        Ok(status)
    } else {
        Err(ActionError::Failed(status))
    }
}
