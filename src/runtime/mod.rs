//! The container runtime collaborator.
//!
//! [`Runtime`] is the seam between the state machine's effects and the
//! daemon. [`DockerClient`] talks to a real daemon; tests supply their own.

mod docker;
mod swarm;

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

pub use crate::demux::ByteStream;
use crate::error::Result;
use crate::model::{
    build_stacks, ContainerInfo, DaemonEvent, DaemonSummary, DiskUsage, ImageInfo, InspectKind,
    NetworkInfo, NodeInfo, ServiceInfo, StackInfo, StatSample, TaskInfo, TaskScope, VolumeInfo,
};
pub use docker::DockerClient;

pub type StatStream = Pin<Box<dyn Stream<Item = Result<StatSample>> + Send>>;
pub type EventStream = Pin<Box<dyn Stream<Item = Result<DaemonEvent>> + Send>>;

/// Where a log pager reads from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSource {
    Container(String),
    Service(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRequest {
    pub source: LogSource,
    /// Unix seconds; 0 means from the beginning of the retained history.
    pub since: i64,
    pub tail: usize,
    pub follow: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Active,
    Pause,
    Drain,
}

impl Availability {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Availability::Active),
            "pause" => Some(Availability::Pause),
            "drain" => Some(Availability::Drain),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Active => "active",
            Availability::Pause => "pause",
            Availability::Drain => "drain",
        }
    }
}

/// A state-changing call. `execute` returns a short detail string for the
/// status line (for example how much space a prune reclaimed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    KillContainer(String),
    StopContainer(String),
    RestartContainer(String),
    RemoveContainer(String),
    RemoveStoppedContainers,
    RemoveImage { id: String, force: bool },
    RemoveDanglingImages,
    RemoveNetwork(String),
    RemoveVolume(String),
    Prune,
    SetNodeAvailability { id: String, availability: Availability },
    ScaleService { id: String, replicas: u64 },
    ForceUpdateService(String),
    RemoveService(String),
    RemoveStack(String),
}

impl Operation {
    /// Past-tense summary shown when the call succeeds.
    pub fn success_message(&self, detail: &str) -> String {
        let msg = match self {
            Operation::KillContainer(id) => format!("Killed container {}", short(id)),
            Operation::StopContainer(id) => format!("Stopped container {}", short(id)),
            Operation::RestartContainer(id) => format!("Restarted container {}", short(id)),
            Operation::RemoveContainer(id) => format!("Removed container {}", short(id)),
            Operation::RemoveStoppedContainers => "Removed stopped containers".to_string(),
            Operation::RemoveImage { id, .. } => format!("Removed image {}", short(id)),
            Operation::RemoveDanglingImages => "Removed dangling images".to_string(),
            Operation::RemoveNetwork(id) => format!("Removed network {}", short(id)),
            Operation::RemoveVolume(name) => format!("Removed volume {}", name),
            Operation::Prune => "Pruned unused data".to_string(),
            Operation::SetNodeAvailability { id, availability } => {
                format!("Node {} set to {}", short(id), availability.as_str())
            }
            Operation::ScaleService { id, replicas } => {
                format!("Scaled service {} to {}", short(id), replicas)
            }
            Operation::ForceUpdateService(id) => format!("Force-updated service {}", short(id)),
            Operation::RemoveService(id) => format!("Removed service {}", short(id)),
            Operation::RemoveStack(name) => format!("Removed stack {}", name),
        };
        if detail.is_empty() { msg } else { format!("{msg} ({detail})") }
    }

    /// Imperative form, for prompts and failure messages.
    pub fn label(&self) -> String {
        match self {
            Operation::KillContainer(id) => format!("kill container {}", short(id)),
            Operation::StopContainer(id) => format!("stop container {}", short(id)),
            Operation::RestartContainer(id) => format!("restart container {}", short(id)),
            Operation::RemoveContainer(id) => format!("remove container {}", short(id)),
            Operation::RemoveStoppedContainers => "remove all stopped containers".to_string(),
            Operation::RemoveImage { id, force: false } => format!("remove image {}", short(id)),
            Operation::RemoveImage { id, force: true } => format!("force remove image {}", short(id)),
            Operation::RemoveDanglingImages => "remove dangling images".to_string(),
            Operation::RemoveNetwork(id) => format!("remove network {}", short(id)),
            Operation::RemoveVolume(name) => format!("remove volume {}", name),
            Operation::Prune => "prune unused containers, images, networks and volumes".to_string(),
            Operation::SetNodeAvailability { id, availability } => {
                format!("set node {} to {}", short(id), availability.as_str())
            }
            Operation::ScaleService { id, replicas } => {
                format!("scale service {} to {}", short(id), replicas)
            }
            Operation::ForceUpdateService(id) => format!("force update service {}", short(id)),
            Operation::RemoveService(id) => format!("remove service {}", short(id)),
            Operation::RemoveStack(name) => format!("remove stack {}", name),
        }
    }
}

fn short(id: &str) -> &str {
    crate::view::safe_truncate_chars(id, 12)
}

pub trait Runtime: Send + Sync + 'static {
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    fn summary(&self) -> impl Future<Output = Result<DaemonSummary>> + Send;

    /// Daemon `info` as pretty-printed JSON.
    fn info_json(&self) -> impl Future<Output = Result<String>> + Send;

    fn list_containers(&self, all: bool) -> impl Future<Output = Result<Vec<ContainerInfo>>> + Send;

    fn list_images(&self) -> impl Future<Output = Result<Vec<ImageInfo>>> + Send;

    fn list_networks(&self) -> impl Future<Output = Result<Vec<NetworkInfo>>> + Send;

    fn list_volumes(&self) -> impl Future<Output = Result<Vec<VolumeInfo>>> + Send;

    fn disk_usage(&self) -> impl Future<Output = Result<DiskUsage>> + Send;

    fn list_nodes(&self) -> impl Future<Output = Result<Vec<NodeInfo>>> + Send;

    fn list_services(&self) -> impl Future<Output = Result<Vec<ServiceInfo>>> + Send;

    fn list_stacks(&self) -> impl Future<Output = Result<Vec<StackInfo>>> + Send {
        async move { Ok(build_stacks(&self.list_services().await?)) }
    }

    fn tasks_of(&self, scope: &TaskScope) -> impl Future<Output = Result<Vec<TaskInfo>>> + Send;

    /// Pretty-printed JSON for one object.
    fn inspect(&self, kind: InspectKind, id: &str) -> impl Future<Output = Result<String>> + Send;

    /// Raw log bytes in the 8-byte framed format understood by
    /// [`crate::demux::Demuxer`].
    fn logs(&self, request: &LogRequest) -> ByteStream;

    fn stats(&self, id: &str) -> StatStream;

    fn events(&self) -> EventStream;

    fn execute(&self, op: &Operation) -> impl Future<Output = Result<String>> + Send;
}
