//! Pairs a cancellation capability with a completion future for long-running
//! worker invocations.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{Backend, BackendError, CommandOutcome, InvokeContext, ProgressSink};

/// Capability to request early termination of one in-flight invocation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

pub type CommandFuture = BoxFuture<'static, Result<CommandOutcome, BackendError>>;

/// Start `command` on the worker and return the cancel capability together
/// with the completion future. Cancellation only requests a backend-side
/// abort: the future always resolves, with `CommandOutcome::Cancelled` when
/// the abort won the race against natural completion. No retries happen here.
pub fn call_async_command(
    backend: &Arc<dyn Backend>,
    command: &str,
    args: Vec<Value>,
    progress: ProgressSink,
) -> (CancelHandle, CommandFuture) {
    let token = CancellationToken::new();
    let completion = backend.invoke(
        command,
        args,
        InvokeContext {
            cancel: token.clone(),
            progress,
        },
    );

    (CancelHandle { token }, completion)
}

pub fn nop_progress() -> ProgressSink {
    Arc::new(|_| {})
}
