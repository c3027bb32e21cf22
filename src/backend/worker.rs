//! Bridge to the native worker process: newline-delimited JSON over stdio,
//! with invocation-id correlation, out-of-band cancel requests, and the
//! push-event pump feeding the [`EventBus`].

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use super::events::EventBus;
use super::{Backend, BackendError, CommandOutcome, InvokeContext, ProgressSink};

/// Overrides the worker executable; the default is resolved from `PATH`.
pub const WORKER_ENV: &str = "COSMICPACK_WORKER";
const DEFAULT_WORKER: &str = "cosmicpack-worker";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum WorkerRequest {
    Invoke {
        id: u64,
        command: String,
        args: Vec<Value>,
    },
    Cancel {
        id: u64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum WorkerFrame {
    Finished { id: u64, value: Value },
    Cancelled { id: u64 },
    Failed { id: u64, message: String },
    Progress { id: u64, payload: Value },
    Event { topic: String, payload: Value },
}

struct Pending {
    reply: oneshot::Sender<Result<CommandOutcome, BackendError>>,
    progress: ProgressSink,
}

struct PendingTable {
    connected: bool,
    invocations: HashMap<u64, Pending>,
}

pub struct WorkerBackend {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    pending: Arc<Mutex<PendingTable>>,
    next_id: AtomicU64,
}

impl WorkerBackend {
    /// Spawn the worker process and bridge its stdio.
    pub fn spawn(bus: Arc<EventBus>) -> anyhow::Result<Arc<Self>> {
        let program = std::env::var(WORKER_ENV).unwrap_or_else(|_| DEFAULT_WORKER.to_string());
        let mut child = Command::new(&program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn backend worker {program:?}"))?;

        let stdin = child.stdin.take().context("worker stdin unavailable")?;
        let stdout = child.stdout.take().context("worker stdout unavailable")?;
        let backend = Self::from_io(stdout, stdin, bus);

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => log::warn!("backend worker exited: {status}"),
                Err(error) => log::error!("failed waiting on backend worker: {error}"),
            }
        });

        Ok(backend)
    }

    /// Bridge an arbitrary reader/writer pair speaking the worker protocol.
    pub fn from_io<R, W>(reader: R, writer: W, bus: Arc<EventBus>) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (requests, mut request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let pending = Arc::new(Mutex::new(PendingTable {
            connected: true,
            invocations: HashMap::new(),
        }));

        tokio::spawn(async move {
            let mut writer = writer;
            while let Some(request) = request_rx.recv().await {
                let mut line = match serde_json::to_string(&request) {
                    Ok(line) => line,
                    Err(error) => {
                        log::error!("failed encoding worker request: {error}");
                        continue;
                    }
                };
                line.push('\n');
                if let Err(error) = writer.write_all(line.as_bytes()).await {
                    log::error!("failed writing to backend worker: {error}");
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<WorkerFrame>(&line) {
                            Ok(frame) => route_frame(&reader_pending, &bus, frame),
                            Err(error) => {
                                log::warn!("dropping malformed worker frame: {error}");
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        log::error!("failed reading from backend worker: {error}");
                        break;
                    }
                }
            }

            // Connection gone: fail everything still in flight.
            let mut table = reader_pending.lock().unwrap();
            table.connected = false;
            for (_, invocation) in table.invocations.drain() {
                let _ = invocation.reply.send(Err(BackendError::Disconnected));
            }
        });

        Arc::new(Self {
            requests,
            pending,
            next_id: AtomicU64::new(1),
        })
    }
}

fn route_frame(pending: &Mutex<PendingTable>, bus: &EventBus, frame: WorkerFrame) {
    match frame {
        WorkerFrame::Finished { id, value } => {
            resolve(pending, id, Ok(CommandOutcome::Finished(value)));
        }
        WorkerFrame::Cancelled { id } => resolve(pending, id, Ok(CommandOutcome::Cancelled)),
        WorkerFrame::Failed { id, message } => {
            resolve(pending, id, Err(BackendError::Worker { message }));
        }
        WorkerFrame::Progress { id, payload } => {
            let progress = pending
                .lock()
                .unwrap()
                .invocations
                .get(&id)
                .map(|invocation| invocation.progress.clone());
            match progress {
                Some(sink) => sink(payload),
                None => log::debug!("progress for unknown invocation {id}"),
            }
        }
        WorkerFrame::Event { topic, payload } => bus.emit(&topic, &payload),
    }
}

fn resolve(
    pending: &Mutex<PendingTable>,
    id: u64,
    result: Result<CommandOutcome, BackendError>,
) {
    match pending.lock().unwrap().invocations.remove(&id) {
        Some(invocation) => {
            let _ = invocation.reply.send(result);
        }
        None => log::warn!("reply for unknown invocation {id}"),
    }
}

impl Backend for WorkerBackend {
    fn invoke(
        &self,
        command: &str,
        args: Vec<Value>,
        ctx: InvokeContext,
    ) -> BoxFuture<'static, Result<CommandOutcome, BackendError>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, mut reply_rx) = oneshot::channel();

        {
            let mut table = self.pending.lock().unwrap();
            if !table.connected {
                return Box::pin(futures::future::ready(Err(BackendError::Disconnected)));
            }
            table.invocations.insert(
                id,
                Pending {
                    reply: reply_tx,
                    progress: ctx.progress,
                },
            );
        }

        let request = WorkerRequest::Invoke {
            id,
            command: command.to_string(),
            args,
        };
        if self.requests.send(request).is_err() {
            self.pending.lock().unwrap().invocations.remove(&id);
            return Box::pin(futures::future::ready(Err(BackendError::Disconnected)));
        }

        let requests = self.requests.clone();
        let cancel = ctx.cancel;
        Box::pin(async move {
            let mut cancel_requested = false;
            loop {
                tokio::select! {
                    reply = &mut reply_rx => {
                        return reply.unwrap_or(Err(BackendError::Disconnected));
                    }
                    () = cancel.cancelled(), if !cancel_requested => {
                        cancel_requested = true;
                        let _ = requests.send(WorkerRequest::Cancel { id });
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use serde_json::json;
    use tokio::io::{
        duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
    };
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::backend::launcher::nop_progress;

    struct FakeWorker {
        lines: tokio::io::Lines<BufReader<ReadHalf<tokio::io::DuplexStream>>>,
        writer: WriteHalf<tokio::io::DuplexStream>,
    }

    impl FakeWorker {
        async fn next_request(&mut self) -> Value {
            let line = self
                .lines
                .next_line()
                .await
                .unwrap()
                .expect("bridge closed the pipe");
            serde_json::from_str(&line).unwrap()
        }

        async fn send_line(&mut self, frame: &Value) {
            let mut line = frame.to_string();
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await.unwrap();
        }

        async fn send_raw(&mut self, raw: &str) {
            self.writer.write_all(raw.as_bytes()).await.unwrap();
        }
    }

    fn bridge(bus: Arc<EventBus>) -> (Arc<WorkerBackend>, FakeWorker) {
        let (gui_side, worker_side) = duplex(4096);
        let (gui_read, gui_write) = split(gui_side);
        let (worker_read, worker_write) = split(worker_side);
        let backend = WorkerBackend::from_io(gui_read, gui_write, bus);
        let worker = FakeWorker {
            lines: BufReader::new(worker_read).lines(),
            writer: worker_write,
        };
        (backend, worker)
    }

    async fn eventually(what: &str, condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
    }

    #[tokio::test]
    async fn finished_reply_resolves_invocation() {
        let (backend, mut worker) = bridge(EventBus::new());

        let completion = backend.invoke(
            "project_list",
            vec![json!("arg")],
            InvokeContext::default(),
        );

        let request = worker.next_request().await;
        assert_eq!(request["type"], "invoke");
        assert_eq!(request["command"], "project_list");
        assert_eq!(request["args"], json!(["arg"]));

        let id = request["id"].clone();
        worker
            .send_line(&json!({"type": "finished", "id": id, "value": [1, 2]}))
            .await;

        assert_eq!(
            completion.await,
            Ok(CommandOutcome::Finished(json!([1, 2])))
        );
    }

    #[tokio::test]
    async fn failed_reply_rejects_with_message() {
        let (backend, mut worker) = bridge(EventBus::new());

        let completion = backend.invoke("project_create_backup", Vec::new(), InvokeContext::default());
        let request = worker.next_request().await;
        let id = request["id"].clone();

        worker
            .send_line(&json!({"type": "failed", "id": id, "message": "no space left"}))
            .await;

        assert_eq!(
            completion.await,
            Err(BackendError::Worker {
                message: "no space left".to_string()
            })
        );
    }

    #[tokio::test]
    async fn cancel_request_goes_out_of_band_and_resolves_cancelled() {
        let (backend, mut worker) = bridge(EventBus::new());

        let cancel = CancellationToken::new();
        let completion = backend.invoke(
            "project_create_backup",
            vec![json!("/p/Proj")],
            InvokeContext {
                cancel: cancel.clone(),
                progress: nop_progress(),
            },
        );
        let completion = tokio::spawn(completion);

        let request = worker.next_request().await;
        let id = request["id"].clone();

        cancel.cancel();
        let cancel_request = worker.next_request().await;
        assert_eq!(cancel_request["type"], "cancel");
        assert_eq!(cancel_request["id"], id);

        worker
            .send_line(&json!({"type": "cancelled", "id": id}))
            .await;

        assert_eq!(completion.await.unwrap(), Ok(CommandOutcome::Cancelled));
    }

    #[tokio::test]
    async fn event_frames_feed_the_bus_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = bus.subscribe("log", move |payload| {
            sink.lock().unwrap().push(payload.clone());
        });

        let (_backend, mut worker) = bridge(bus);

        worker
            .send_line(&json!({"type": "event", "topic": "log", "payload": {"n": 1}}))
            .await;
        worker
            .send_line(&json!({"type": "event", "topic": "log", "payload": {"n": 2}}))
            .await;

        eventually("both events", || seen.lock().unwrap().len() == 2).await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({"n": 1}), json!({"n": 2})]
        );
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_without_breaking_the_bridge() {
        let (backend, mut worker) = bridge(EventBus::new());

        let completion = backend.invoke("project_list", Vec::new(), InvokeContext::default());
        let request = worker.next_request().await;
        let id = request["id"].clone();

        worker.send_raw("{\"type\": \"garbage\"\n").await;
        worker
            .send_line(&json!({"type": "finished", "id": id, "value": null}))
            .await;

        assert_eq!(
            completion.await,
            Ok(CommandOutcome::Finished(Value::Null))
        );
    }

    #[tokio::test]
    async fn progress_frames_route_to_the_invocation_sink() {
        let (backend, mut worker) = bridge(EventBus::new());

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressSink = Arc::new(move |payload| {
            sink.lock().unwrap().push(payload);
        });

        let completion = backend.invoke(
            "project_create_backup",
            Vec::new(),
            InvokeContext {
                cancel: CancellationToken::new(),
                progress,
            },
        );

        let request = worker.next_request().await;
        let id = request["id"].clone();

        worker
            .send_line(&json!({"type": "progress", "id": id, "payload": {"current": 3, "total": 9}}))
            .await;
        worker
            .send_line(&json!({"type": "finished", "id": id, "value": null}))
            .await;

        completion.await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({"current": 3, "total": 9})]
        );
    }

    #[tokio::test]
    async fn disconnect_fails_pending_and_later_invocations() {
        let (backend, mut worker) = bridge(EventBus::new());

        let completion = backend.invoke("project_list", Vec::new(), InvokeContext::default());
        let _request = worker.next_request().await;

        drop(worker);

        assert_eq!(completion.await, Err(BackendError::Disconnected));

        eventually("bridge to notice the disconnect", || {
            !backend.pending.lock().unwrap().connected
        })
        .await;
        let later = backend.invoke("project_list", Vec::new(), InvokeContext::default());
        assert_eq!(later.await, Err(BackendError::Disconnected));
    }
}
