//! Interface to the native worker: named asynchronous command invocations with
//! out-of-band cancellation, one-shot queries, and the push-event channel.

pub mod events;
pub mod launcher;
pub mod worker;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::project::Project;
use crate::models::repository::Repository;

/// Operations exposed by the worker process.
pub mod commands {
    pub const DEEP_LINK_HAS_ADD_REPOSITORY: &str = "deep_link_has_add_repository";
    pub const ENVIRONMENT_LANGUAGE: &str = "environment_language";
    pub const PROJECT_CREATE_BACKUP: &str = "project_create_backup";
    pub const PROJECT_LIST: &str = "project_list";
    pub const REPOSITORY_ADD: &str = "repository_add";
    pub const REPOSITORY_LIST: &str = "repository_list";
    pub const REPOSITORY_REMOVE: &str = "repository_remove";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Operation-level failure reported by the worker.
    #[error("{message}")]
    Worker { message: String },
    #[error("backend worker disconnected")]
    Disconnected,
    #[error("malformed backend payload: {0}")]
    Payload(String),
}

/// Final resolution of an invocation that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Finished(Value),
    Cancelled,
}

/// Sink for per-invocation progress notifications. The GUI ignores progress;
/// [`launcher::nop_progress`] is the default sink.
pub type ProgressSink = Arc<dyn Fn(Value) + Send + Sync>;

pub struct InvokeContext {
    /// Requests a backend-side abort of the invocation. Cancellation is
    /// cooperative; callers still await the final resolution.
    pub cancel: CancellationToken,
    pub progress: ProgressSink,
}

impl Default for InvokeContext {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            progress: launcher::nop_progress(),
        }
    }
}

pub trait Backend: Send + Sync {
    /// Invoke a named worker operation with positional arguments.
    fn invoke(
        &self,
        command: &str,
        args: Vec<Value>,
        ctx: InvokeContext,
    ) -> BoxFuture<'static, Result<CommandOutcome, BackendError>>;
}

/// Stand-in used when the worker process could not be started. Every
/// invocation fails, which surfaces as error toasts instead of a dead UI.
pub struct OfflineBackend;

impl Backend for OfflineBackend {
    fn invoke(
        &self,
        command: &str,
        _args: Vec<Value>,
        _ctx: InvokeContext,
    ) -> BoxFuture<'static, Result<CommandOutcome, BackendError>> {
        log::warn!("rejecting {command}: backend worker is not running");
        Box::pin(futures::future::ready(Err(BackendError::Disconnected)))
    }
}

async fn invoke_value(
    backend: Arc<dyn Backend>,
    command: &str,
    args: Vec<Value>,
) -> Result<Value, BackendError> {
    match backend.invoke(command, args, InvokeContext::default()).await? {
        CommandOutcome::Finished(value) => Ok(value),
        CommandOutcome::Cancelled => Err(BackendError::Payload(format!(
            "query {command} resolved as cancelled"
        ))),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|error| BackendError::Payload(error.to_string()))
}

pub async fn deep_link_has_add_repository(
    backend: Arc<dyn Backend>,
) -> Result<bool, BackendError> {
    invoke_value(backend, commands::DEEP_LINK_HAS_ADD_REPOSITORY, Vec::new())
        .await
        .and_then(decode)
}

pub async fn environment_language(backend: Arc<dyn Backend>) -> Result<String, BackendError> {
    invoke_value(backend, commands::ENVIRONMENT_LANGUAGE, Vec::new())
        .await
        .and_then(decode)
}

pub async fn project_list(backend: Arc<dyn Backend>) -> Result<Vec<Project>, BackendError> {
    invoke_value(backend, commands::PROJECT_LIST, Vec::new())
        .await
        .and_then(decode)
}

pub async fn repository_list(backend: Arc<dyn Backend>) -> Result<Vec<Repository>, BackendError> {
    invoke_value(backend, commands::REPOSITORY_LIST, Vec::new())
        .await
        .and_then(decode)
}

pub async fn repository_add(
    backend: Arc<dyn Backend>,
    repository: Repository,
) -> Result<(), BackendError> {
    invoke_value(
        backend,
        commands::REPOSITORY_ADD,
        vec![json!(repository.name), json!(repository.url)],
    )
    .await
    .map(|_| ())
}

pub async fn repository_remove(
    backend: Arc<dyn Backend>,
    url: String,
) -> Result<(), BackendError> {
    invoke_value(backend, commands::REPOSITORY_REMOVE, vec![json!(url)])
        .await
        .map(|_| ())
}

#[cfg(test)]
pub mod testing {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use tokio::sync::oneshot;

    use super::*;

    pub enum Script {
        Immediate(Result<CommandOutcome, BackendError>),
        /// Resolves when the test fires the sender; ignores cancellation,
        /// modelling an operation that completes naturally.
        Deferred(oneshot::Receiver<Result<CommandOutcome, BackendError>>),
        /// Runs until the invocation's cancel token fires.
        UntilCancelled,
    }

    #[derive(Default)]
    pub struct ScriptedBackend {
        scripts: Mutex<HashMap<String, VecDeque<Script>>>,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn script(&self, command: &str, script: Script) {
            self.scripts
                .lock()
                .unwrap()
                .entry(command.to_string())
                .or_default()
                .push_back(script);
        }

        pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Backend for ScriptedBackend {
        fn invoke(
            &self,
            command: &str,
            args: Vec<Value>,
            ctx: InvokeContext,
        ) -> BoxFuture<'static, Result<CommandOutcome, BackendError>> {
            self.calls.lock().unwrap().push((command.to_string(), args));
            let script = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(command)
                .and_then(VecDeque::pop_front);
            let command = command.to_string();

            Box::pin(async move {
                match script {
                    None => Err(BackendError::Worker {
                        message: format!("unscripted command {command}"),
                    }),
                    Some(Script::Immediate(result)) => result,
                    Some(Script::Deferred(reply)) => {
                        reply.await.unwrap_or(Err(BackendError::Disconnected))
                    }
                    Some(Script::UntilCancelled) => {
                        ctx.cancel.cancelled().await;
                        Ok(CommandOutcome::Cancelled)
                    }
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedBackend};
    use super::*;

    #[tokio::test]
    async fn query_decodes_typed_payload() {
        let backend = ScriptedBackend::new();
        backend.script(
            commands::ENVIRONMENT_LANGUAGE,
            Script::Immediate(Ok(CommandOutcome::Finished(json!("ja")))),
        );

        let language = environment_language(backend).await.unwrap();
        assert_eq!(language, "ja");
    }

    #[tokio::test]
    async fn query_with_mismatched_shape_fails_closed() {
        let backend = ScriptedBackend::new();
        backend.script(
            commands::DEEP_LINK_HAS_ADD_REPOSITORY,
            Script::Immediate(Ok(CommandOutcome::Finished(json!({"nope": 1})))),
        );

        let result = deep_link_has_add_repository(backend).await;
        assert!(matches!(result, Err(BackendError::Payload(_))));
    }

    #[tokio::test]
    async fn worker_failure_carries_message() {
        let backend = ScriptedBackend::new();
        backend.script(
            commands::PROJECT_LIST,
            Script::Immediate(Err(BackendError::Worker {
                message: "disk full".to_string(),
            })),
        );

        let error = project_list(backend).await.unwrap_err();
        assert_eq!(error.to_string(), "disk full");
    }

    #[tokio::test]
    async fn repository_add_sends_positional_args() {
        let backend = ScriptedBackend::new();
        backend.script(
            commands::REPOSITORY_ADD,
            Script::Immediate(Ok(CommandOutcome::Finished(Value::Null))),
        );

        let repository = Repository {
            name: "Curated".to_string(),
            url: "https://packages.example.com/curated.json".to_string(),
        };
        repository_add(backend.clone(), repository).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1,
            vec![
                json!("Curated"),
                json!("https://packages.example.com/curated.json")
            ]
        );
    }

    #[tokio::test]
    async fn offline_backend_rejects_everything() {
        let backend: Arc<dyn Backend> = Arc::new(OfflineBackend);
        let result = project_list(backend).await;
        assert_eq!(result, Err(BackendError::Disconnected));
    }
}
