//! Swarm calls go through the `docker` CLI, whose `--format '{{json .}}'`
//! output already carries the aggregated columns (replica counts, manager
//! status) that the raw API would make us compute.

use std::collections::HashMap;
use std::process::Stdio;

use futures_util::stream;
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::demux::{encode_frame, ByteStream, StreamKind};
use crate::error::{Result, RuntimeError};
use crate::model::{NodeInfo, ServiceInfo, TaskInfo, TaskScope};

use super::Availability;

const STACK_LABEL: &str = "com.docker.stack.namespace";

pub(super) struct SwarmCli {
    host: Option<String>,
}

impl SwarmCli {
    pub fn new(host: Option<String>) -> Self {
        Self { host }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("docker");
        if let Some(host) = &self.host {
            cmd.arg("--host").arg(host);
        }
        cmd.args(args);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Run to completion and return stdout, or the trimmed stderr as an error.
    async fn run(&self, args: &[&str]) -> Result<String> {
        tracing::debug!(?args, "docker cli");
        let output = self.command(args).output().await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(RuntimeError::Command {
                command: format!("docker {}", args.iter().take(2).copied().collect::<Vec<_>>().join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn run_json_lines<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>> {
        let text = self.run(args).await?;
        parse_json_lines(&text)
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        self.run_json_lines(&["node", "ls", "--format", "{{json .}}"]).await
    }

    /// Services with their stack label filled in from one batched inspect.
    pub async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        let mut services: Vec<ServiceInfo> = self
            .run_json_lines(&["service", "ls", "--format", "{{json .}}"])
            .await?;
        if services.is_empty() {
            return Ok(services);
        }

        let format = format!(r#"{{{{.ID}}}} {{{{index .Spec.Labels "{STACK_LABEL}"}}}}"#);
        let mut args = vec!["service", "inspect", "--format", format.as_str()];
        args.extend(services.iter().map(|s| s.id.as_str()));
        let labels = match self.run(&args).await {
            Ok(text) => parse_stack_labels(&text, &services),
            Err(err) => {
                tracing::warn!(%err, "stack labels unavailable");
                HashMap::new()
            }
        };
        for svc in &mut services {
            if let Some(label) = labels.get(&svc.id) {
                svc.stack = label.clone();
            }
        }
        Ok(services)
    }

    pub async fn tasks_of(&self, scope: &TaskScope) -> Result<Vec<TaskInfo>> {
        match scope {
            TaskScope::Service { id, .. } => {
                self.run_json_lines(&["service", "ps", "--format", "{{json .}}", id.as_str()]).await
            }
            TaskScope::Node { id, .. } => {
                self.run_json_lines(&["node", "ps", "--format", "{{json .}}", id.as_str()]).await
            }
            TaskScope::Stack { name } => {
                self.run_json_lines(&["stack", "ps", "--format", "{{json .}}", name.as_str()]).await
            }
        }
    }

    pub async fn inspect(&self, object: &str, id: &str) -> Result<String> {
        match object {
            "task" => self.run(&["inspect", "--type", "task", id]).await,
            _ => self.run(&[object, "inspect", id]).await,
        }
    }

    pub async fn set_node_availability(&self, id: &str, availability: Availability) -> Result<()> {
        self.run(&["node", "update", "--availability", availability.as_str(), id]).await?;
        Ok(())
    }

    pub async fn scale_service(&self, id: &str, replicas: u64) -> Result<()> {
        let arg = format!("{}={}", id, replicas);
        self.run(&["service", "scale", "--detach", arg.as_str()]).await?;
        Ok(())
    }

    /// Rolling restart of every replica.
    pub async fn force_update_service(&self, id: &str) -> Result<()> {
        self.run(&["service", "update", "--force", "--detach", id]).await?;
        Ok(())
    }

    pub async fn remove_services(&self, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut args = vec!["service", "rm"];
        args.extend_from_slice(ids);
        self.run(&args).await?;
        Ok(())
    }

    /// Remove every service carrying the stack label `name`.
    pub async fn remove_stack(&self, name: &str) -> Result<usize> {
        let services = self.list_services().await?;
        let ids: Vec<&str> = services
            .iter()
            .filter(|s| s.stack == name)
            .map(|s| s.id.as_str())
            .collect();
        if ids.is_empty() {
            return Err(RuntimeError::NotFound(format!("stack {name}")));
        }
        self.remove_services(&ids).await?;
        Ok(ids.len())
    }

    /// `docker service logs` with stdout and stderr re-framed so the output
    /// goes through the same demultiplexer as container logs. The child is
    /// killed once the returned stream is dropped.
    pub fn service_logs(&self, id: &str, since: i64, tail: usize, follow: bool) -> ByteStream {
        let tail = tail.to_string();
        let since = since.to_string();
        let mut args = vec!["service", "logs", "--tail", tail.as_str()];
        if since != "0" {
            args.extend(["--since", since.as_str()]);
        }
        if follow {
            args.push("--follow");
        }
        args.push(id);

        let mut cmd = self.command(&args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let (tx, rx) = mpsc::channel::<Result<Vec<u8>>>(64);
        match cmd.spawn() {
            Ok(child) => {
                tokio::spawn(pump_child(child, tx));
            }
            Err(err) => {
                // The receiver is still alive, so this cannot fail.
                let _ = tx.try_send(Err(err.into()));
            }
        }

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }
}

async fn pump_child(mut child: tokio::process::Child, tx: mpsc::Sender<Result<Vec<u8>>>) {
    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.start_kill();
        return;
    };
    let mut out_buf = vec![0u8; 8192];
    let mut err_buf = vec![0u8; 8192];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        let (kind, read) = tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => (StreamKind::Stdout, read),
            read = stderr.read(&mut err_buf), if err_open => (StreamKind::Stderr, read),
            _ = tx.closed() => break,
        };
        let item = match read {
            Ok(0) => {
                match kind {
                    StreamKind::Stderr => err_open = false,
                    _ => out_open = false,
                }
                continue;
            }
            Ok(n) => {
                let buf = if kind == StreamKind::Stderr { &err_buf } else { &out_buf };
                Ok(encode_frame(kind, &buf[..n]))
            }
            Err(err) => Err(err.into()),
        };
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            break;
        }
    }

    let _ = child.start_kill();
    let _ = child.wait().await;
    tracing::debug!("service log process reaped");
}

fn parse_json_lines<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| serde_json::from_str(line).map_err(RuntimeError::from))
        .collect()
}

/// Parse "SERVICE_ID STACK" lines. `inspect` prints full 64-char IDs while
/// `ls` prints short ones, so match by prefix with a minimum length guard.
fn parse_stack_labels(text: &str, services: &[ServiceInfo]) -> HashMap<String, String> {
    let mut result = HashMap::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (id, label) = line.split_once(' ').unwrap_or((line, ""));
        let label = match label.trim() {
            "<no value>" => "",
            other => other,
        };
        if let Some(svc) = services
            .iter()
            .find(|s| s.id.len() >= 10 && id.starts_with(&s.id))
        {
            result.insert(svc.id.clone(), label.to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines_skip_blank_lines() {
        let text = "{\"ID\":\"a\",\"Name\":\"web\"}\n\n{\"ID\":\"b\",\"Name\":\"api\",\"Replicas\":\"1/2\"}\n";
        let services: Vec<ServiceInfo> = parse_json_lines(text).unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[1].replicas, "1/2");
    }

    #[test]
    fn json_lines_report_garbage() {
        let result: Result<Vec<ServiceInfo>> = parse_json_lines("not json");
        assert!(matches!(result, Err(RuntimeError::Json(_))));
    }

    #[test]
    fn stack_labels_match_full_ids_by_prefix() {
        let services = vec![
            ServiceInfo { id: "abcdef123456".into(), ..Default::default() },
            ServiceInfo { id: "0123456789ab".into(), ..Default::default() },
        ];
        let text = "abcdef1234567890ffff shop\n0123456789abcdef0000 <no value>\n";
        let labels = parse_stack_labels(text, &services);
        assert_eq!(labels["abcdef123456"], "shop");
        assert_eq!(labels["0123456789ab"], "");
    }

    #[tokio::test]
    async fn service_logs_without_cli_reports_an_error_or_ends() {
        use futures_util::StreamExt;
        let cli = SwarmCli::new(Some("unix:///nonexistent/berth-test.sock".into()));
        let mut logs = cli.service_logs("nope", 0, 10, false);
        let drained = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            while let Some(item) = logs.next().await {
                if item.is_err() {
                    break;
                }
            }
        })
        .await;
        assert!(drained.is_ok());
    }
}
