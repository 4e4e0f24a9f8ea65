use crate::component::{SortKey, TableRow};

use super::{
    ContainerInfo, DiskUsage, ImageInfo, MonitorRow, NetworkInfo, NodeInfo, ServiceInfo,
    StackInfo, TaskInfo, UsageKind, UsageRow, VolumeInfo,
};

/// One line of any resource table. Section and group headers carry no
/// identifier and take no actions.
#[derive(Clone, Debug, PartialEq)]
pub enum Row {
    Container(ContainerInfo),
    Image(ImageInfo),
    Network(NetworkInfo),
    Volume(VolumeInfo),
    Usage(UsageRow),
    Monitor(MonitorRow),
    Node(NodeInfo),
    Service(ServiceInfo),
    Stack(StackInfo),
    Task(TaskInfo),
    Section(String),
    Group(String),
}

impl Row {
    /// Name used in prompts and pager titles.
    pub fn display_name(&self) -> String {
        match self {
            Row::Container(c) => c.name.clone(),
            Row::Image(i) => i.tag.clone(),
            Row::Network(n) => n.name.clone(),
            Row::Volume(v) => v.name.clone(),
            Row::Usage(u) => u.name.clone(),
            Row::Monitor(m) => m.name.clone(),
            Row::Node(n) => n.hostname.clone(),
            Row::Service(s) => s.name.clone(),
            Row::Stack(s) => s.name.clone(),
            Row::Task(t) => t.name.clone(),
            Row::Section(title) | Row::Group(title) => title.clone(),
        }
    }
}

impl TableRow for Row {
    fn columns(&self) -> Vec<String> {
        match self {
            Row::Container(c) => c.columns(),
            Row::Image(i) => i.columns(),
            Row::Network(n) => n.columns(),
            Row::Volume(v) => v.columns(),
            Row::Usage(u) => u.columns(),
            Row::Monitor(m) => m.columns(),
            Row::Node(n) => n.columns(),
            Row::Service(s) => s.columns(),
            Row::Stack(s) => s.columns(),
            Row::Task(t) => t.columns(),
            Row::Section(title) => vec![format!("── {title} ──")],
            Row::Group(title) => vec![format!("▸ {title}")],
        }
    }

    fn id(&self) -> Option<&str> {
        match self {
            Row::Container(c) => c.id(),
            Row::Image(i) => i.id(),
            Row::Network(n) => n.id(),
            Row::Volume(v) => v.id(),
            Row::Usage(u) => u.id(),
            Row::Monitor(m) => m.id(),
            Row::Node(n) => n.id(),
            Row::Service(s) => s.id(),
            Row::Stack(s) => s.id(),
            Row::Task(t) => t.id(),
            Row::Section(_) | Row::Group(_) => None,
        }
    }

    fn is_header(&self) -> bool {
        matches!(self, Row::Section(_) | Row::Group(_))
    }

    fn sort_key(&self, column: usize) -> SortKey {
        match self {
            Row::Container(c) => c.sort_key(column),
            Row::Image(i) => i.sort_key(column),
            Row::Network(n) => n.sort_key(column),
            Row::Volume(v) => v.sort_key(column),
            Row::Usage(u) => u.sort_key(column),
            Row::Monitor(m) => m.sort_key(column),
            Row::Node(n) => n.sort_key(column),
            Row::Service(s) => s.sort_key(column),
            Row::Stack(s) => s.sort_key(column),
            Row::Task(t) => t.sort_key(column),
            Row::Section(_) | Row::Group(_) => SortKey::Text(String::new()),
        }
    }
}

/// Summary block followed by one section per usage type.
pub fn disk_usage_rows(usage: &DiskUsage) -> Vec<Row> {
    let mut rows = vec![Row::Section("Summary".to_string())];
    rows.extend(UsageKind::ALL.iter().map(|&k| Row::Usage(usage.summary(k))));
    for kind in UsageKind::ALL {
        let items = usage.items(kind);
        if items.is_empty() {
            continue;
        }
        rows.push(Row::Section(kind.label().to_string()));
        rows.extend(items.iter().cloned().map(Row::Usage));
    }
    rows
}

/// Tasks under one group header per service, services in name order.
pub fn grouped_task_rows(mut tasks: Vec<TaskInfo>) -> Vec<Row> {
    tasks.sort_by(|a, b| a.service_name().cmp(b.service_name()));
    let mut rows = Vec::with_capacity(tasks.len());
    let mut current: Option<String> = None;
    for task in tasks {
        if current.as_deref() != Some(task.service_name()) {
            let service = task.service_name().to_string();
            rows.push(Row::Group(service.clone()));
            current = Some(service);
        }
        rows.push(Row::Task(task));
    }
    rows
}
