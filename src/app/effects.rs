//! Runs [`Cmd`]s as tokio tasks. A task never touches application state;
//! it turns its outcome into one [`Msg`] and sends it back.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

use crate::cancel::CancelToken;
use crate::demux::{Chunk, LogReader};
use crate::error::{Result, RuntimeError};
use crate::model::{disk_usage_rows, grouped_task_rows, Row, TaskScope, ViewMode};
use crate::runtime::{EventStream, Runtime, StatStream};

use super::{Cmd, Msg, StatSink};

/// Spawn `cmd` on `handle`.
pub fn perform<R: Runtime>(handle: &Handle, runtime: &Arc<R>, cmd: Cmd, tx: &UnboundedSender<Msg>) {
    let runtime = Arc::clone(runtime);
    let tx = tx.clone();
    handle.spawn(async move {
        let msg = execute(runtime.as_ref(), cmd).await;
        // Fails only once the loop has exited.
        let _ = tx.send(msg);
    });
}

/// Run one command to completion.
pub async fn execute<R: Runtime>(runtime: &R, cmd: Cmd) -> Msg {
    match cmd {
        Cmd::Summary => match runtime.summary().await {
            Ok(summary) => Msg::Summary(summary),
            Err(err) => Msg::SummaryFailed(err.to_string()),
        },
        Cmd::Load { view, all, scope } => match load(runtime, view, all, scope.as_ref()).await {
            Ok(rows) => Msg::Loaded { view, scope, rows },
            Err(err) => {
                tracing::warn!(?view, %err, "load failed");
                Msg::LoadFailed {
                    view,
                    error: err.to_string(),
                }
            }
        },
        Cmd::ListMonitor => match runtime.list_containers(false).await {
            Ok(containers) => Msg::MonitorListed(containers),
            Err(err) => Msg::LoadFailed {
                view: ViewMode::Monitor,
                error: err.to_string(),
            },
        },
        Cmd::Inspect { kind, id, title } => match runtime.inspect(kind, &id).await {
            Ok(text) => Msg::TextLoaded { title, text },
            Err(err) => Msg::TextFailed {
                title,
                error: err.to_string(),
            },
        },
        Cmd::Info => match runtime.info_json().await {
            Ok(text) => Msg::TextLoaded {
                title: "Daemon info".to_string(),
                text,
            },
            Err(err) => Msg::TextFailed {
                title: "Daemon info".to_string(),
                error: err.to_string(),
            },
        },
        Cmd::Act(op) => {
            tracing::info!(op = %op.label(), "executing");
            match runtime.execute(&op).await {
                Ok(detail) => Msg::OperationDone { op, detail },
                Err(err) => {
                    tracing::warn!(op = %op.label(), %err, "operation failed");
                    Msg::OperationFailed {
                        op,
                        error: err.to_string(),
                    }
                }
            }
        }
        Cmd::OpenLogs {
            pager,
            request,
            cancel,
        } => {
            tracing::debug!(pager, ?request, "log stream opened");
            let reader = LogReader::new(runtime.logs(&request));
            read_logs(pager, reader, cancel).await
        }
        Cmd::ReadLogs {
            pager,
            reader,
            cancel,
        } => read_logs(pager, reader, cancel).await,
        Cmd::OpenStats { sink, id, cancel } => {
            tracing::debug!(?sink, %id, "stats stream opened");
            read_stats(sink, runtime.stats(&id), cancel).await
        }
        Cmd::ReadStats {
            sink,
            stream,
            cancel,
        } => read_stats(sink, stream, cancel).await,
        Cmd::WatchEvents => read_events(runtime.events()).await,
        Cmd::ReadEvents(stream) => read_events(stream).await,
        Cmd::Timer { after, msg } => {
            tokio::time::sleep(after).await;
            *msg
        }
    }
}

async fn load<R: Runtime>(
    runtime: &R,
    view: ViewMode,
    all: bool,
    scope: Option<&TaskScope>,
) -> Result<Vec<Row>> {
    let rows = match view {
        ViewMode::Containers => rows(runtime.list_containers(all).await?, Row::Container),
        ViewMode::Images => rows(runtime.list_images().await?, Row::Image),
        ViewMode::Networks => rows(runtime.list_networks().await?, Row::Network),
        ViewMode::Volumes => rows(runtime.list_volumes().await?, Row::Volume),
        ViewMode::DiskUsage => disk_usage_rows(&runtime.disk_usage().await?),
        // Listed through `Cmd::ListMonitor`, which keeps subscriptions.
        ViewMode::Monitor => return Err(RuntimeError::Invalid("monitor rows are not loaded".to_string())),
        ViewMode::Nodes => rows(runtime.list_nodes().await?, Row::Node),
        ViewMode::Services => rows(runtime.list_services().await?, Row::Service),
        ViewMode::Stacks => rows(runtime.list_stacks().await?, Row::Stack),
        ViewMode::ServiceTasks | ViewMode::StackTasks | ViewMode::NodeTasks => {
            let scope = scope.ok_or_else(|| RuntimeError::Invalid("no task scope".to_string()))?;
            let tasks = runtime.tasks_of(scope).await?;
            match scope {
                TaskScope::Stack { .. } => grouped_task_rows(tasks),
                _ => rows(tasks, Row::Task),
            }
        }
    };
    Ok(rows)
}

fn rows<T>(items: Vec<T>, wrap: impl Fn(T) -> Row) -> Vec<Row> {
    items.into_iter().map(wrap).collect()
}

/// One read. Cancellation wins over a pending read so a closed pager never
/// waits on a quiet container.
async fn read_logs(pager: u64, mut reader: LogReader, cancel: CancelToken) -> Msg {
    let chunk = tokio::select! {
        _ = cancel.cancelled() => None,
        chunk = reader.next_chunk() => Some(chunk),
    };
    match chunk {
        None => Msg::LogEnded { pager, error: None },
        Some(Chunk::Text(text)) => Msg::LogChunk { pager, text, reader },
        Some(Chunk::End) => Msg::LogEnded { pager, error: None },
        Some(Chunk::Failed(error)) => Msg::LogEnded {
            pager,
            error: Some(error),
        },
    }
}

async fn read_stats(sink: StatSink, mut stream: StatStream, cancel: CancelToken) -> Msg {
    let next = tokio::select! {
        _ = cancel.cancelled() => None,
        next = stream.next() => Some(next),
    };
    match next {
        None => Msg::StatsEnded { sink, error: None },
        Some(Some(Ok(sample))) => Msg::StatSample {
            sink,
            sample,
            stream,
        },
        Some(Some(Err(err))) => Msg::StatsEnded {
            sink,
            error: Some(err.to_string()),
        },
        Some(None) => Msg::StatsEnded { sink, error: None },
    }
}

async fn read_events(mut stream: EventStream) -> Msg {
    match stream.next().await {
        Some(Ok(event)) => Msg::DaemonEvent { event, stream },
        Some(Err(err)) => {
            tracing::warn!(%err, "event stream failed");
            Msg::EventsEnded {
                error: Some(err.to_string()),
            }
        }
        None => Msg::EventsEnded { error: None },
    }
}
