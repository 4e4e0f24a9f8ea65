use std::collections::BTreeMap;

use serde::Deserialize;

use crate::component::{SortKey, TableRow};

/// Services without the stack namespace label are grouped under this name.
pub const NO_STACK: &str = "(no stack)";

/// A single Swarm node, as printed by `docker node ls --format '{{json .}}'`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NodeInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "Status")]
    pub status: String,         // "Ready", "Down"
    #[serde(rename = "Availability")]
    pub availability: String,   // "Active", "Pause", "Drain"
    #[serde(rename = "ManagerStatus")]
    #[serde(default)]
    pub manager_status: String, // "Leader", "Reachable", ""
    #[serde(rename = "EngineVersion")]
    #[serde(default)]
    pub engine_version: String,
    #[serde(rename = "Self")]
    #[serde(default)]
    pub is_self: bool,
}

impl NodeInfo {
    pub fn role(&self) -> &str {
        if self.manager_status.is_empty() { "worker" } else { "manager" }
    }
}

impl TableRow for NodeInfo {
    fn columns(&self) -> Vec<String> {
        let hostname = if self.is_self {
            format!("{} *", self.hostname)
        } else {
            self.hostname.clone()
        };
        vec![
            self.id.clone(),
            hostname,
            self.status.clone(),
            self.availability.clone(),
            self.role().to_string(),
            self.manager_status.clone(),
            self.engine_version.clone(),
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// A Swarm service, as printed by `docker service ls --format '{{json .}}'`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mode")]
    #[serde(default)]
    pub mode: String,           // "replicated", "global"
    #[serde(rename = "Replicas")]
    #[serde(default)]
    pub replicas: String,       // "3/3"
    #[serde(rename = "Image")]
    #[serde(default)]
    pub image: String,
    #[serde(rename = "Ports")]
    #[serde(default)]
    pub ports: String,
    /// From the `com.docker.stack.namespace` label; empty when unset.
    #[serde(skip)]
    pub stack: String,
}

impl TableRow for ServiceInfo {
    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.mode.clone(),
            self.replicas.clone(),
            self.image.clone(),
            self.ports.clone(),
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// A Swarm task (replica of a service), as printed by `docker service ps`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TaskInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Image")]
    #[serde(default)]
    pub image: String,
    #[serde(rename = "Node")]
    #[serde(default)]
    pub node: String,
    #[serde(rename = "DesiredState")]
    #[serde(default)]
    pub desired_state: String,
    #[serde(rename = "CurrentState")]
    #[serde(default)]
    pub current_state: String,
    #[serde(rename = "Error")]
    #[serde(default)]
    pub error: String,
    #[serde(rename = "Ports")]
    #[serde(default)]
    pub ports: String,
}

impl TaskInfo {
    /// `web.1` and `web.1.xyz` both belong to service `web`; history entries
    /// are printed as `\_ web.1`.
    pub fn service_name(&self) -> &str {
        let name = self.name.trim().trim_start_matches("\\_").trim();
        match name.split_once('.') {
            Some((service, _)) => service,
            None => name,
        }
    }
}

impl TableRow for TaskInfo {
    fn columns(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.image.clone(),
            self.node.clone(),
            self.desired_state.clone(),
            self.current_state.clone(),
            self.error.clone(),
        ]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// Services deployed together under one stack namespace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackInfo {
    pub name: String,
    pub services: Vec<String>,  // service IDs
    pub degraded: usize,
}

impl TableRow for StackInfo {
    fn columns(&self) -> Vec<String> {
        let health = if self.degraded == 0 {
            "ok".to_string()
        } else {
            format!("{} degraded", self.degraded)
        };
        vec![self.name.clone(), self.services.len().to_string(), health]
    }

    fn id(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn sort_key(&self, column: usize) -> SortKey {
        match column {
            1 => SortKey::Number(self.services.len() as f64),
            2 => SortKey::Number(self.degraded as f64),
            _ => SortKey::Text(self.name.to_lowercase()),
        }
    }
}

/// Whose tasks a task view is showing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskScope {
    Service { id: String, name: String },
    Stack { name: String },
    Node { id: String, name: String },
}

impl TaskScope {
    pub fn label(&self) -> String {
        match self {
            TaskScope::Service { name, .. } => format!("service {name}"),
            TaskScope::Stack { name } => format!("stack {name}"),
            TaskScope::Node { name, .. } => format!("node {name}"),
        }
    }
}

/// Check if a replica string like "2/3" indicates degraded state.
pub fn is_replica_degraded(replicas: &str) -> bool {
    // "2/3 (max 1 per node)" is also valid output
    let replicas = replicas.split_whitespace().next().unwrap_or("");
    if let Some((current, desired)) = replicas.split_once('/') {
        let current: u32 = current.trim().parse().unwrap_or(0);
        let desired: u32 = desired.trim().parse().unwrap_or(0);
        return desired > 0 && current < desired;
    }
    false
}

/// Group services by stack label, sorted by name with unlabeled services last.
pub fn build_stacks(services: &[ServiceInfo]) -> Vec<StackInfo> {
    let mut groups: BTreeMap<&str, StackInfo> = BTreeMap::new();
    for svc in services {
        let name = if svc.stack.is_empty() { NO_STACK } else { svc.stack.as_str() };
        let stack = groups.entry(name).or_insert_with(|| StackInfo {
            name: name.to_string(),
            ..Default::default()
        });
        stack.services.push(svc.id.clone());
        if is_replica_degraded(&svc.replicas) {
            stack.degraded += 1;
        }
    }

    let mut stacks: Vec<StackInfo> = groups.into_values().collect();
    stacks.sort_by(|a, b| {
        (a.name == NO_STACK)
            .cmp(&(b.name == NO_STACK))
            .then_with(|| a.name.cmp(&b.name))
    });
    stacks
}
