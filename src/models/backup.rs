//! State machine for the cancellable project-backup operation.

use thiserror::Error;

use crate::backend::launcher::CancelHandle;
use crate::backend::{BackendError, CommandOutcome};
use crate::models::notice::NoticeKind;

/// Lifecycle of the single backup a user can have in flight.
#[derive(Debug, Default)]
pub enum BackupState {
    #[default]
    Idle,
    Running {
        cancel: CancelHandle,
    },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[error("a backup is already running")]
pub struct BackupInFlight;

impl BackupState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Accept a freshly launched operation. Rejected while one is in flight;
    /// callers must not have issued a second invocation in that case.
    pub fn begin(&mut self, cancel: CancelHandle) -> Result<(), BackupInFlight> {
        if self.is_running() {
            return Err(BackupInFlight);
        }
        *self = Self::Running { cancel };
        Ok(())
    }

    /// Ask the worker to abort the running backup. The state stays `Running`
    /// until the completion future delivers its final resolution.
    pub fn request_cancel(&self) {
        if let Self::Running { cancel } = self {
            cancel.cancel();
        }
    }

    /// Record the operation's final resolution. Returns `false` when nothing
    /// was running, which callers treat as a stale completion.
    pub fn settle(&mut self) -> bool {
        match std::mem::take(self) {
            Self::Running { .. } => true,
            Self::Idle => false,
        }
    }
}

/// Toast severity for a finished backup.
pub fn completion_notice(result: &Result<CommandOutcome, BackendError>) -> NoticeKind {
    match result {
        Ok(CommandOutcome::Finished(_)) => NoticeKind::Success,
        Ok(CommandOutcome::Cancelled) => NoticeKind::Normal,
        Err(_) => NoticeKind::Error,
    }
}
