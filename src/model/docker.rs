use crate::component::{SortKey, TableRow};
use crate::view::{format_age, format_bytes};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerInfo {
    pub id: String,           // short ID (first 12 chars)
    pub name: String,
    pub image: String,
    pub command: String,
    pub state: String,        // "running", "exited", ...
    pub status: String,       // "Up 2 hours"
    pub created: i64,         // unix seconds
    pub ports: String,        // "0.0.0.0:8080->80/tcp"
    pub ip_address: String,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

impl TableRow for ContainerInfo {
    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.image.clone(),
            self.state.clone(),
            self.status.clone(),
            format_age(self.created),
            self.ports.clone(),
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn sort_key(&self, column: usize) -> SortKey {
        match column {
            // newest first reads better than alphabetical "2d"/"3h"
            5 => SortKey::Number(-(self.created as f64)),
            _ => SortKey::Text(
                self.columns()
                    .get(column)
                    .map(|c| c.to_lowercase())
                    .unwrap_or_default(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageInfo {
    pub id: String,
    pub tag: String,          // "nginx:1.27" or "<none>:<none>"
    pub created: i64,
    pub size: i64,
    pub containers: i64,      // -1 when the daemon did not count
}

impl ImageInfo {
    pub fn is_dangling(&self) -> bool {
        self.tag == "<none>:<none>"
    }
}

impl TableRow for ImageInfo {
    fn columns(&self) -> Vec<String> {
        let containers = if self.containers < 0 {
            "-".to_string()
        } else {
            self.containers.to_string()
        };
        vec![
            self.id.clone(),
            self.tag.clone(),
            format_age(self.created),
            format_bytes(self.size.max(0) as u64),
            containers,
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn sort_key(&self, column: usize) -> SortKey {
        match column {
            2 => SortKey::Number(-(self.created as f64)),
            3 => SortKey::Number(self.size as f64),
            4 => SortKey::Number(self.containers as f64),
            0 => SortKey::Text(self.id.clone()),
            _ => SortKey::Text(self.tag.to_lowercase()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub internal: bool,
}

impl TableRow for NetworkInfo {
    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.driver.clone(),
            self.scope.clone(),
            if self.internal { "yes" } else { "no" }.to_string(),
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeInfo {
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub mountpoint: String,
}

impl TableRow for VolumeInfo {
    fn columns(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.driver.clone(),
            self.scope.clone(),
            self.mountpoint.clone(),
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.name)
    }
}

// --- Disk usage ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageKind {
    Images,
    Containers,
    Volumes,
    BuildCache,
}

impl UsageKind {
    pub const ALL: [UsageKind; 4] = [
        UsageKind::Images,
        UsageKind::Containers,
        UsageKind::Volumes,
        UsageKind::BuildCache,
    ];

    pub fn label(self) -> &'static str {
        match self {
            UsageKind::Images => "Images",
            UsageKind::Containers => "Containers",
            UsageKind::Volumes => "Local Volumes",
            UsageKind::BuildCache => "Build Cache",
        }
    }
}

/// One line of the disk usage view: either a per-type summary or an item.
#[derive(Clone, Debug, PartialEq)]
pub struct UsageRow {
    pub kind: UsageKind,
    /// Empty for summary rows.
    pub id: String,
    pub name: String,
    pub active: String,
    pub size: i64,
    pub reclaimable: i64,
}

impl TableRow for UsageRow {
    fn columns(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.active.clone(),
            format_bytes(self.size.max(0) as u64),
            format_bytes(self.reclaimable.max(0) as u64),
        ]
    }

    fn id(&self) -> Option<&str> {
        if self.id.is_empty() { None } else { Some(&self.id) }
    }

    fn sort_key(&self, column: usize) -> SortKey {
        match column {
            2 => SortKey::Number(self.size as f64),
            3 => SortKey::Number(self.reclaimable as f64),
            1 => SortKey::Text(self.active.clone()),
            _ => SortKey::Text(self.name.to_lowercase()),
        }
    }
}

/// Items per type as reported by the daemon's `df`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiskUsage {
    pub images: Vec<UsageRow>,
    pub containers: Vec<UsageRow>,
    pub volumes: Vec<UsageRow>,
    pub build_cache: Vec<UsageRow>,
}

impl DiskUsage {
    pub fn items(&self, kind: UsageKind) -> &[UsageRow] {
        match kind {
            UsageKind::Images => &self.images,
            UsageKind::Containers => &self.containers,
            UsageKind::Volumes => &self.volumes,
            UsageKind::BuildCache => &self.build_cache,
        }
    }

    /// "TYPE  active/total  size  reclaimable" for one kind.
    pub fn summary(&self, kind: UsageKind) -> UsageRow {
        let items = self.items(kind);
        let active = items.iter().filter(|i| i.reclaimable == 0).count();
        UsageRow {
            kind,
            id: String::new(),
            name: kind.label().to_string(),
            active: format!("{}/{}", active, items.len()),
            size: items.iter().map(|i| i.size.max(0)).sum(),
            reclaimable: items.iter().map(|i| i.reclaimable.max(0)).sum(),
        }
    }
}

// --- Live stats ---

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatSample {
    pub cpu_percent: f64,
    pub mem_usage: u64,
    pub mem_limit: u64,
    pub net_rx: u64,
    pub net_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
    pub pids: u64,
}

impl StatSample {
    pub fn mem_percent(&self) -> f64 {
        if self.mem_limit == 0 {
            0.0
        } else {
            self.mem_usage as f64 / self.mem_limit as f64 * 100.0
        }
    }

    /// Single-line rendering used by the stats pager.
    pub fn describe(&self) -> String {
        format!(
            "cpu {:>6.2}%  mem {} / {} ({:.1}%)  net {} / {}  block {} / {}  pids {}",
            self.cpu_percent,
            format_bytes(self.mem_usage),
            format_bytes(self.mem_limit),
            self.mem_percent(),
            format_bytes(self.net_rx),
            format_bytes(self.net_tx),
            format_bytes(self.block_read),
            format_bytes(self.block_write),
            self.pids,
        )
    }
}

/// A monitor view line: one running container and its latest sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MonitorRow {
    pub id: String,
    pub name: String,
    pub sample: Option<StatSample>,
    /// Set once the stats stream for this container ended.
    pub ended: Option<String>,
}

impl TableRow for MonitorRow {
    fn columns(&self) -> Vec<String> {
        let mut cols = vec![self.id.clone(), self.name.clone()];
        match &self.sample {
            Some(s) => cols.extend([
                format!("{:.2}%", s.cpu_percent),
                format!("{} / {}", format_bytes(s.mem_usage), format_bytes(s.mem_limit)),
                format!("{:.2}%", s.mem_percent()),
                format!("{} / {}", format_bytes(s.net_rx), format_bytes(s.net_tx)),
                format!("{} / {}", format_bytes(s.block_read), format_bytes(s.block_write)),
                s.pids.to_string(),
            ]),
            None => {
                let placeholder = if self.ended.is_some() { "ended" } else { "..." };
                cols.extend(std::iter::repeat_n(placeholder.to_string(), 6));
            }
        }
        cols
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn sort_key(&self, column: usize) -> SortKey {
        let Some(s) = &self.sample else {
            return match column {
                0 => SortKey::Text(self.id.clone()),
                1 => SortKey::Text(self.name.to_lowercase()),
                _ => SortKey::Number(f64::MIN),
            };
        };
        match column {
            2 => SortKey::Number(s.cpu_percent),
            3 => SortKey::Number(s.mem_usage as f64),
            4 => SortKey::Number(s.mem_percent()),
            5 => SortKey::Number((s.net_rx + s.net_tx) as f64),
            6 => SortKey::Number((s.block_read + s.block_write) as f64),
            7 => SortKey::Number(s.pids as f64),
            0 => SortKey::Text(self.id.clone()),
            _ => SortKey::Text(self.name.to_lowercase()),
        }
    }
}

// --- Daemon ---

/// Shown in the header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DaemonSummary {
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
    pub host: String,
    pub swarm_role: String,   // "manager", "worker" or "inactive"
    pub containers_running: i64,
    pub containers_total: i64,
    pub images: i64,
}

/// An unsolicited change notification from the events stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DaemonEvent {
    pub time: i64,
    pub kind: String,         // "container", "image", "service", ...
    pub action: String,
    pub actor_id: String,
    pub actor_name: String,
}

impl DaemonEvent {
    pub fn describe(&self) -> String {
        let time = chrono::DateTime::from_timestamp(self.time, 0)
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        let id: String = self.actor_id.chars().take(12).collect();
        if self.actor_name.is_empty() {
            format!("{} {:<10} {:<16} {}", time, self.kind, self.action, id)
        } else {
            format!("{} {:<10} {:<16} {} ({})", time, self.kind, self.action, id, self.actor_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(kind: UsageKind, id: &str, size: i64, reclaimable: i64) -> UsageRow {
        UsageRow {
            kind,
            id: id.into(),
            name: id.into(),
            active: String::new(),
            size,
            reclaimable,
        }
    }

    #[test]
    fn disk_usage_summary_totals_items() {
        let du = DiskUsage {
            images: vec![
                usage(UsageKind::Images, "a", 100, 0),
                usage(UsageKind::Images, "b", 50, 50),
            ],
            ..Default::default()
        };
        let summary = du.summary(UsageKind::Images);
        assert_eq!(summary.active, "1/2");
        assert_eq!(summary.size, 150);
        assert_eq!(summary.reclaimable, 50);
        assert_eq!(summary.id(), None);
        assert_eq!(du.summary(UsageKind::Volumes).active, "0/0");
    }

    #[test]
    fn dangling_image_detection() {
        let img = ImageInfo { tag: "<none>:<none>".into(), ..Default::default() };
        assert!(img.is_dangling());
        let img = ImageInfo { tag: "nginx:latest".into(), ..Default::default() };
        assert!(!img.is_dangling());
    }

    #[test]
    fn monitor_row_placeholder_until_first_sample() {
        let mut row = MonitorRow { id: "abc".into(), name: "web".into(), ..Default::default() };
        assert_eq!(row.columns()[2], "...");
        row.ended = Some("gone".into());
        assert_eq!(row.columns()[2], "ended");
        row.sample = Some(StatSample { cpu_percent: 12.5, mem_usage: 50, mem_limit: 200, ..Default::default() });
        assert_eq!(row.columns()[2], "12.50%");
        assert_eq!(row.columns()[4], "25.00%");
    }

    #[test]
    fn container_age_sorts_newest_first() {
        let old = ContainerInfo { created: 100, ..Default::default() };
        let new = ContainerInfo { created: 200, ..Default::default() };
        assert_eq!(new.sort_key(5).compare(&old.sort_key(5)), std::cmp::Ordering::Less);
    }
}
