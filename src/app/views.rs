use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::cancel::CancelToken;
use crate::component::{Column, MenuItem, Overlay, Pager, Table, TableRow, Target};
use crate::model::{InspectKind, Row, TaskScope, ViewMode};
use crate::runtime::{LogRequest, LogSource, Operation};

use super::{Action, App, Cmd, Followup, Layer, Msg, PagerKind, StatSink};

/// Rows taken by everything except the table body: tab bar, column header,
/// status line and footer.
const CHROME_ROWS: usize = 4;

pub(super) const HELP: &str = "\
Global
  q, Ctrl-c        quit
  ?                this help
  1..7             containers, images, networks, volumes, nodes, services, stacks
  m                monitor on/off
  H                show/hide the daemon header
  F8               disk usage
  F9               daemon events
  F10              daemon info

Every list
  Up/Down, j/k     move
  PgUp/PgDn        page
  Home/End, g/G    first/last row
  F1               cycle sort column
  F5               refresh
  %                filter rows

Containers
  Enter            action menu
  l / i / s        logs / inspect / stats
  Ctrl-k           kill
  Ctrl-t           stop
  Ctrl-r           restart
  Ctrl-e           remove
  Ctrl-x           remove all stopped
  F2               show all / running only

Images
  Enter            action menu
  i                inspect
  Ctrl-e / Ctrl-f  remove / force remove
  Ctrl-d           remove dangling

Networks, Volumes
  i                inspect
  Ctrl-e           remove

Disk usage
  Ctrl-p           prune

Nodes
  Enter            tasks on node
  i                inspect
  Ctrl-a           set availability

Services
  Enter            tasks of service
  i / l            inspect / logs
  Ctrl-s           scale
  Ctrl-u           force update
  Ctrl-r           remove

Stacks
  Enter            tasks of stack
  Ctrl-r           remove stack

Tasks
  i                inspect
  Esc, Backspace   back

Pager
  Up/Down, PgUp/PgDn, g/G   scroll
  /                search, n/N next/previous match
  f                filter lines (Esc clears)
  F                follow on/off
  q, Esc           close
";

pub(super) fn columns(view: ViewMode) -> Vec<Column> {
    match view {
        ViewMode::Containers => vec![
            Column::fixed("ID", 12),
            Column::flex("NAME"),
            Column::flex("IMAGE"),
            Column::fixed("STATE", 10),
            Column::fixed("STATUS", 22),
            Column::fixed("AGE", 8),
            Column::flex("PORTS"),
        ],
        ViewMode::Images => vec![
            Column::fixed("ID", 12),
            Column::flex("TAG"),
            Column::fixed("AGE", 8),
            Column::fixed("SIZE", 10),
            Column::fixed("CONTAINERS", 10),
        ],
        ViewMode::Networks => vec![
            Column::fixed("ID", 12),
            Column::flex("NAME"),
            Column::fixed("DRIVER", 10),
            Column::fixed("SCOPE", 8),
            Column::fixed("INTERNAL", 8),
        ],
        ViewMode::Volumes => vec![
            Column::flex("NAME"),
            Column::fixed("DRIVER", 10),
            Column::fixed("SCOPE", 8),
            Column::flex("MOUNTPOINT"),
        ],
        ViewMode::DiskUsage => vec![
            Column::flex("NAME"),
            Column::fixed("ACTIVE", 10),
            Column::fixed("SIZE", 10),
            Column::fixed("RECLAIMABLE", 12),
        ],
        ViewMode::Monitor => vec![
            Column::fixed("ID", 12),
            Column::flex("NAME"),
            Column::fixed("CPU %", 8),
            Column::fixed("MEM USAGE / LIMIT", 21),
            Column::fixed("MEM %", 7),
            Column::fixed("NET I/O", 21),
            Column::fixed("BLOCK I/O", 21),
            Column::fixed("PIDS", 5),
        ],
        ViewMode::Nodes => vec![
            Column::fixed("ID", 12),
            Column::flex("HOSTNAME"),
            Column::fixed("STATUS", 8),
            Column::fixed("AVAILABILITY", 12),
            Column::fixed("ROLE", 8),
            Column::fixed("MANAGER", 11),
            Column::fixed("ENGINE", 10),
        ],
        ViewMode::Services => vec![
            Column::fixed("ID", 12),
            Column::flex("NAME"),
            Column::fixed("MODE", 10),
            Column::fixed("REPLICAS", 10),
            Column::flex("IMAGE"),
            Column::flex("PORTS"),
        ],
        ViewMode::Stacks => vec![
            Column::flex("NAME"),
            Column::fixed("SERVICES", 8),
            Column::fixed("HEALTH", 12),
        ],
        ViewMode::ServiceTasks | ViewMode::StackTasks | ViewMode::NodeTasks => vec![
            Column::fixed("ID", 12),
            Column::flex("NAME"),
            Column::flex("IMAGE"),
            Column::fixed("NODE", 14),
            Column::fixed("DESIRED", 8),
            Column::fixed("CURRENT", 20),
            Column::flex("ERROR"),
        ],
    }
}

/// What `i` inspects in each view.
fn inspect_kind(view: ViewMode) -> Option<InspectKind> {
    match view {
        ViewMode::Containers | ViewMode::Monitor => Some(InspectKind::Container),
        ViewMode::Images => Some(InspectKind::Image),
        ViewMode::Networks => Some(InspectKind::Network),
        ViewMode::Volumes => Some(InspectKind::Volume),
        ViewMode::Nodes => Some(InspectKind::Node),
        ViewMode::Services => Some(InspectKind::Service),
        ViewMode::ServiceTasks | ViewMode::StackTasks | ViewMode::NodeTasks => {
            Some(InspectKind::Task)
        }
        ViewMode::DiskUsage | ViewMode::Stacks => None,
    }
}

/// Per-view key bindings that map onto an [`Action`].
pub(super) fn action_for_key(view: ViewMode, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match (view, key.code, ctrl) {
        (_, KeyCode::Char('i'), false) => Action::Inspect,

        (ViewMode::Containers | ViewMode::Monitor, KeyCode::Char('l'), false) => Action::Logs,
        (ViewMode::Containers | ViewMode::Monitor, KeyCode::Char('s'), false) => Action::Stats,
        (ViewMode::Containers, KeyCode::Char('k'), true) => Action::Kill,
        (ViewMode::Containers, KeyCode::Char('t'), true) => Action::Stop,
        (ViewMode::Containers, KeyCode::Char('r'), true) => Action::Restart,
        (ViewMode::Containers, KeyCode::Char('x'), true) => Action::RemoveStopped,

        (ViewMode::Images, KeyCode::Char('f'), true) => Action::ForceRemove,
        (ViewMode::Images, KeyCode::Char('d'), true) => Action::RemoveDangling,

        (
            ViewMode::Containers | ViewMode::Images | ViewMode::Networks | ViewMode::Volumes,
            KeyCode::Char('e'),
            true,
        ) => Action::Remove,

        (ViewMode::DiskUsage, KeyCode::Char('p'), true) => Action::Prune,

        (ViewMode::Nodes | ViewMode::Services | ViewMode::Stacks, KeyCode::Enter, _) => {
            Action::Tasks
        }
        (ViewMode::Nodes, KeyCode::Char('a'), true) => Action::SetAvailability,

        (ViewMode::Services, KeyCode::Char('l'), false) => Action::Logs,
        (ViewMode::Services, KeyCode::Char('s'), true) => Action::Scale,
        (ViewMode::Services, KeyCode::Char('u'), true) => Action::ForceUpdate,
        (ViewMode::Services | ViewMode::Stacks, KeyCode::Char('r'), true) => Action::Remove,

        _ => return None,
    };
    Some(action)
}

/// Actions that work on the whole view rather than the selected row.
pub(super) fn needs_target(action: Action) -> bool {
    !matches!(action, Action::RemoveStopped | Action::RemoveDangling | Action::Prune)
}

/// Entries of the `Enter` menu, for views that have one.
pub(super) fn menu_items(view: ViewMode) -> Option<Vec<MenuItem<Action>>> {
    let actions: &[Action] = match view {
        ViewMode::Containers => &[
            Action::Logs,
            Action::Inspect,
            Action::Stats,
            Action::Restart,
            Action::Stop,
            Action::Kill,
            Action::Remove,
        ],
        ViewMode::Images => &[Action::Inspect, Action::Remove, Action::ForceRemove],
        _ => return None,
    };
    Some(
        actions
            .iter()
            .map(|&a| MenuItem::new(a.label(), a))
            .collect(),
    )
}

impl App {
    /// Visible table rows for the current terminal size.
    pub(super) fn body_height(&self) -> usize {
        let header = usize::from(self.show_header);
        (self.size.1 as usize)
            .saturating_sub(CHROME_ROWS + header)
            .max(1)
    }

    /// Pager text area: everything but its title and footer lines.
    pub(super) fn pager_size(&self) -> (usize, usize) {
        (self.size.0 as usize, (self.size.1 as usize).saturating_sub(2).max(1))
    }

    pub(super) fn resize_all(&mut self) {
        let width = self.size.0 as usize;
        let height = self.body_height();
        for table in self.tables.values_mut() {
            table.set_size(width, height);
        }
        let (width, height) = self.pager_size();
        if let Some(Layer::Pager(layer)) = &mut self.layer {
            layer.pager.set_size(width, height);
        }
    }

    pub(super) fn table_mut(&mut self) -> Option<&mut Table<Row>> {
        self.tables.get_mut(&self.view)
    }

    /// Issue a load for `view` unless one is already in flight, in which
    /// case the view is reloaded again once that one lands.
    pub(super) fn request_load(&mut self, view: ViewMode) -> Vec<Cmd> {
        if self.loading.contains(&view) {
            self.stale.insert(view);
            return Vec::new();
        }
        if view.is_task_view() && self.task_scope.is_none() {
            return Vec::new();
        }
        self.loading.insert(view);
        tracing::debug!(?view, "load requested");
        let cmd = match view {
            ViewMode::Monitor => Cmd::ListMonitor,
            _ => Cmd::Load {
                view,
                all: self.show_all,
                scope: if view.is_task_view() {
                    self.task_scope.clone()
                } else {
                    None
                },
            },
        };
        vec![cmd]
    }

    pub(super) fn switch_view(&mut self, target: ViewMode) -> Vec<Cmd> {
        if target == self.view {
            return self.request_load(target);
        }
        if self.view == ViewMode::Monitor {
            self.stop_monitor();
        }
        tracing::debug!(from = ?self.view, to = ?target, "switch view");
        self.view = target;
        if target == ViewMode::Monitor {
            self.start_monitor()
        } else {
            self.request_load(target)
        }
    }

    fn start_monitor(&mut self) -> Vec<Cmd> {
        self.monitor_epoch += 1;
        let mut cmds = self.request_load(ViewMode::Monitor);
        cmds.push(self.monitor_timer());
        cmds
    }

    pub(super) fn monitor_timer(&self) -> Cmd {
        Cmd::Timer {
            after: self.config.monitor_interval,
            msg: Box::new(Msg::MonitorTick(self.monitor_epoch)),
        }
    }

    /// Cancel every stats subscription. Readers wake up and report back,
    /// but nothing waits for them here.
    pub(super) fn stop_monitor(&mut self) {
        if !self.monitor.is_empty() {
            tracing::debug!(count = self.monitor.len(), "cancelling stats subscriptions");
        }
        for (_, cancel) in self.monitor.drain() {
            cancel.cancel();
        }
        // The next session subscribes every row again.
        if let Some(table) = self.tables.get_mut(&ViewMode::Monitor) {
            table.set_rows(Vec::new());
        }
        self.monitor_epoch += 1;
    }

    pub(super) fn enter_task_view(&mut self, scope: TaskScope) -> Vec<Cmd> {
        let target = match scope {
            TaskScope::Service { .. } => ViewMode::ServiceTasks,
            TaskScope::Stack { .. } => ViewMode::StackTasks,
            TaskScope::Node { .. } => ViewMode::NodeTasks,
        };
        if !self.view.is_task_view() {
            self.previous = self.view;
        }
        if self.task_scope.as_ref() != Some(&scope) {
            if let Some(table) = self.tables.get_mut(&target) {
                table.set_rows(Vec::new());
            }
        }
        self.task_scope = Some(scope);
        // A load for a different scope may be in flight; its result is
        // dropped on arrival, so do not wait for it.
        self.loading.remove(&target);
        self.switch_view(target)
    }

    pub(super) fn back(&mut self) -> Vec<Cmd> {
        if self.view.is_task_view() {
            self.switch_view(self.previous)
        } else {
            Vec::new()
        }
    }

    /// The row under the cursor, as an overlay target.
    pub(super) fn selected_target(&self) -> Option<(Target, Row)> {
        let row = self.active_table()?.selected()?;
        let id = row.id()?;
        Some((Target::new(id, row.display_name()), row.clone()))
    }

    /// Run `action` against `target` in the current view.
    pub(super) fn run_action(&mut self, action: Action, target: Target, row: Option<Row>) -> Vec<Cmd> {
        let view = self.view;
        let id = target.id.clone();
        let name = target.name.clone();
        match action {
            Action::Inspect => {
                let Some(kind) = inspect_kind(view) else {
                    return Vec::new();
                };
                vec![Cmd::Inspect {
                    kind,
                    title: format!("{} {}", kind.label(), name),
                    id,
                }]
            }
            Action::Logs => {
                let source = match view {
                    ViewMode::Services => LogSource::Service(id),
                    _ => LogSource::Container(id),
                };
                let cancel = CancelToken::new();
                let pager = Pager::live(
                    format!("Logs: {name}"),
                    self.config.log_buffer,
                );
                let pager_id = self.open_pager(PagerKind::Logs, pager, Some(cancel.clone()));
                tracing::info!(?source, "opening logs");
                vec![Cmd::OpenLogs {
                    pager: pager_id,
                    request: LogRequest {
                        source,
                        since: 0,
                        tail: self.config.log_tail,
                        follow: true,
                    },
                    cancel,
                }]
            }
            Action::Stats => {
                let cancel = CancelToken::new();
                let pager = Pager::live(
                    format!("Stats: {name}"),
                    self.config.log_buffer,
                );
                let pager_id = self.open_pager(PagerKind::Stats, pager, Some(cancel.clone()));
                vec![Cmd::OpenStats {
                    sink: StatSink::Pager(pager_id),
                    id,
                    cancel,
                }]
            }
            Action::Tasks => {
                let scope = match view {
                    ViewMode::Services => TaskScope::Service { id, name },
                    ViewMode::Nodes => TaskScope::Node { id, name },
                    ViewMode::Stacks => TaskScope::Stack { name: id },
                    _ => return Vec::new(),
                };
                self.enter_task_view(scope)
            }
            Action::SetAvailability => {
                self.prompt_input(Followup::Availability, target, "Availability (active, pause, drain):", "")
            }
            Action::Scale => {
                let current = match &row {
                    Some(Row::Service(s)) => desired_replicas(&s.replicas),
                    _ => String::new(),
                };
                self.prompt_input(Followup::Scale, target, "Replicas:", &current)
            }
            _ => {
                let op = match destructive_operation(action, view, &id) {
                    Some(op) => op,
                    None => return Vec::new(),
                };
                let prompt = format!("Really {}? (y/n)", prompt_label(&op, &name));
                self.layer = Some(Layer::Prompt(Overlay::confirm(
                    Followup::Confirm(op),
                    target,
                    prompt,
                )));
                Vec::new()
            }
        }
    }

    fn prompt_input(&mut self, tag: Followup, target: Target, prompt: &str, initial: &str) -> Vec<Cmd> {
        self.layer = Some(Layer::Prompt(Overlay::input(
            tag, target, prompt, initial,
        )));
        Vec::new()
    }
}

/// The operation behind a confirmed action, if `action` is destructive in
/// `view`.
fn destructive_operation(action: Action, view: ViewMode, id: &str) -> Option<Operation> {
    let id = id.to_string();
    let op = match (action, view) {
        (Action::Kill, _) => Operation::KillContainer(id),
        (Action::Stop, _) => Operation::StopContainer(id),
        (Action::Restart, _) => Operation::RestartContainer(id),
        (Action::RemoveStopped, _) => Operation::RemoveStoppedContainers,
        (Action::RemoveDangling, _) => Operation::RemoveDanglingImages,
        (Action::Prune, _) => Operation::Prune,
        (Action::ForceUpdate, _) => Operation::ForceUpdateService(id),
        (Action::ForceRemove, ViewMode::Images) => Operation::RemoveImage { id, force: true },
        (Action::Remove, ViewMode::Containers) => Operation::RemoveContainer(id),
        (Action::Remove, ViewMode::Images) => Operation::RemoveImage { id, force: false },
        (Action::Remove, ViewMode::Networks) => Operation::RemoveNetwork(id),
        (Action::Remove, ViewMode::Volumes) => Operation::RemoveVolume(id),
        (Action::Remove, ViewMode::Services) => Operation::RemoveService(id),
        (Action::Remove, ViewMode::Stacks) => Operation::RemoveStack(id),
        _ => return None,
    };
    Some(op)
}

/// Prompts read better with the name the user sees than with an id.
fn prompt_label(op: &Operation, name: &str) -> String {
    match op {
        Operation::KillContainer(_) => format!("kill container {name}"),
        Operation::StopContainer(_) => format!("stop container {name}"),
        Operation::RestartContainer(_) => format!("restart container {name}"),
        Operation::RemoveContainer(_) => format!("remove container {name}"),
        Operation::RemoveImage { force: false, .. } => format!("remove image {name}"),
        Operation::RemoveImage { force: true, .. } => format!("force remove image {name}"),
        Operation::RemoveNetwork(_) => format!("remove network {name}"),
        Operation::RemoveVolume(_) => format!("remove volume {name}"),
        Operation::ForceUpdateService(_) => format!("force update service {name}"),
        Operation::RemoveService(_) => format!("remove service {name}"),
        Operation::RemoveStack(_) => format!("remove stack {name} and all its services"),
        other => other.label(),
    }
}

/// "2/3" -> "3", "2/3 (max 1 per node)" -> "3".
fn desired_replicas(replicas: &str) -> String {
    replicas
        .split('/')
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("")
        .to_string()
}
