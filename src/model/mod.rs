// Re-export all model types from submodules.

pub use app::{InspectKind, ResourceKind, ViewMode};
pub use docker::{
    ContainerInfo, DaemonEvent, DaemonSummary, DiskUsage, ImageInfo, MonitorRow, NetworkInfo,
    StatSample, UsageKind, UsageRow, VolumeInfo,
};
pub use row::{disk_usage_rows, grouped_task_rows, Row};
pub use swarm::{
    build_stacks, is_replica_degraded, NodeInfo, ServiceInfo, StackInfo, TaskInfo, TaskScope,
    NO_STACK,
};

mod app;
mod docker;
mod row;
mod swarm;
