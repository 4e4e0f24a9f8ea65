/// The active top-level view. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Containers,
    Images,
    Networks,
    Volumes,
    DiskUsage,
    Monitor,
    Nodes,
    Services,
    Stacks,
    ServiceTasks,
    StackTasks,
    NodeTasks,
}

impl ViewMode {
    pub const ALL: [ViewMode; 12] = [
        ViewMode::Containers,
        ViewMode::Images,
        ViewMode::Networks,
        ViewMode::Volumes,
        ViewMode::DiskUsage,
        ViewMode::Monitor,
        ViewMode::Nodes,
        ViewMode::Services,
        ViewMode::Stacks,
        ViewMode::ServiceTasks,
        ViewMode::StackTasks,
        ViewMode::NodeTasks,
    ];

    /// Views reachable with the number keys, in key order.
    pub const NUMBERED: [ViewMode; 7] = [
        ViewMode::Containers,
        ViewMode::Images,
        ViewMode::Networks,
        ViewMode::Volumes,
        ViewMode::Nodes,
        ViewMode::Services,
        ViewMode::Stacks,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Containers => "Containers",
            ViewMode::Images => "Images",
            ViewMode::Networks => "Networks",
            ViewMode::Volumes => "Volumes",
            ViewMode::DiskUsage => "Disk Usage",
            ViewMode::Monitor => "Monitor",
            ViewMode::Nodes => "Nodes",
            ViewMode::Services => "Services",
            ViewMode::Stacks => "Stacks",
            ViewMode::ServiceTasks | ViewMode::StackTasks | ViewMode::NodeTasks => "Tasks",
        }
    }

    pub fn is_task_view(self) -> bool {
        matches!(
            self,
            ViewMode::ServiceTasks | ViewMode::StackTasks | ViewMode::NodeTasks
        )
    }
}

/// Resource type carried by a daemon change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Container,
    Image,
    Network,
    Volume,
    Node,
    Service,
}

impl ResourceKind {
    /// Map the `Type` field of a daemon event.
    pub fn from_event_type(kind: &str) -> Option<Self> {
        match kind {
            "container" => Some(ResourceKind::Container),
            "image" => Some(ResourceKind::Image),
            "network" => Some(ResourceKind::Network),
            "volume" => Some(ResourceKind::Volume),
            "node" => Some(ResourceKind::Node),
            "service" => Some(ResourceKind::Service),
            _ => None,
        }
    }

    /// Whether a change to this resource type makes `view` stale.
    pub fn affects(self, view: ViewMode) -> bool {
        match self {
            ResourceKind::Container => matches!(
                view,
                ViewMode::Containers
                    | ViewMode::DiskUsage
                    | ViewMode::Monitor
                    | ViewMode::ServiceTasks
                    | ViewMode::StackTasks
                    | ViewMode::NodeTasks
            ),
            ResourceKind::Image => matches!(view, ViewMode::Images | ViewMode::DiskUsage),
            ResourceKind::Network => view == ViewMode::Networks,
            ResourceKind::Volume => matches!(view, ViewMode::Volumes | ViewMode::DiskUsage),
            ResourceKind::Node => matches!(view, ViewMode::Nodes | ViewMode::NodeTasks),
            ResourceKind::Service => matches!(
                view,
                ViewMode::Services | ViewMode::Stacks | ViewMode::ServiceTasks | ViewMode::StackTasks
            ),
        }
    }
}

/// Object kinds that can be inspected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InspectKind {
    Container,
    Image,
    Network,
    Volume,
    Node,
    Service,
    Task,
}

impl InspectKind {
    pub fn label(self) -> &'static str {
        match self {
            InspectKind::Container => "container",
            InspectKind::Image => "image",
            InspectKind::Network => "network",
            InspectKind::Volume => "volume",
            InspectKind::Node => "node",
            InspectKind::Service => "service",
            InspectKind::Task => "task",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_map_to_resource_kinds() {
        assert_eq!(ResourceKind::from_event_type("container"), Some(ResourceKind::Container));
        assert_eq!(ResourceKind::from_event_type("service"), Some(ResourceKind::Service));
        assert_eq!(ResourceKind::from_event_type("plugin"), None);
    }

    #[test]
    fn every_list_view_is_affected_by_some_kind() {
        let kinds = [
            ResourceKind::Container,
            ResourceKind::Image,
            ResourceKind::Network,
            ResourceKind::Volume,
            ResourceKind::Node,
            ResourceKind::Service,
        ];
        for view in ViewMode::ALL {
            assert!(kinds.iter().any(|k| k.affects(view)), "{view:?}");
        }
    }

    #[test]
    fn numbered_views_are_not_task_views() {
        assert!(ViewMode::NUMBERED.iter().all(|v| !v.is_task_view()));
        assert!(ViewMode::StackTasks.is_task_view());
    }
}
