use std::collections::HashMap;

use crate::cancel::CancelToken;
use crate::component::{Outcome, OverlayResult, Pager, TableRow};
use crate::model::{ContainerInfo, MonitorRow, ResourceKind, Row, ViewMode};
use crate::runtime::{Availability, Operation};

use super::{Action, App, Cmd, Followup, Msg, PagerKind, StatSink, EVENT_HISTORY};

impl App {
    /// Handle one message. Never blocks; anything slow comes back as a
    /// [`Cmd`] for the executor.
    pub fn update(&mut self, msg: Msg) -> Vec<Cmd> {
        match msg {
            Msg::Key(key) => self.handle_key(key),
            Msg::Resize(width, height) => {
                self.size = (width, height);
                self.resize_all();
                Vec::new()
            }
            Msg::Summary(summary) => {
                self.summary = Some(summary);
                Vec::new()
            }
            Msg::SummaryFailed(error) => {
                tracing::warn!(%error, "daemon summary unavailable");
                Vec::new()
            }
            Msg::Loaded { view, scope, rows } => self.on_loaded(view, scope, rows),
            Msg::LoadFailed { view, error } => {
                self.loading.remove(&view);
                self.stale.remove(&view);
                // Rows from the last successful load stay on screen.
                vec![self.error(format!("Loading {} failed: {}", view.title(), error))]
            }
            Msg::MonitorListed(containers) => self.on_monitor_listed(containers),
            Msg::MonitorTick(epoch) => {
                if self.view != ViewMode::Monitor || epoch != self.monitor_epoch {
                    return Vec::new();
                }
                let mut cmds = self.request_load(ViewMode::Monitor);
                cmds.push(self.monitor_timer());
                cmds
            }
            Msg::TextLoaded { title, text } => {
                if matches!(self.layer, Some(super::Layer::Prompt(_))) {
                    tracing::debug!(%title, "prompt open, dropping text");
                    return Vec::new();
                }
                let pager = Pager::new(title, &text, self.config.log_buffer);
                self.open_pager(PagerKind::Text, pager, None);
                Vec::new()
            }
            Msg::TextFailed { title, error } => vec![self.error(format!("{title}: {error}"))],
            Msg::OperationDone { op, detail } => {
                tracing::info!(op = %op.label(), "operation done");
                let mut cmds = vec![self.info(op.success_message(&detail))];
                cmds.extend(self.request_load(self.view));
                cmds
            }
            Msg::OperationFailed { op, error } => {
                vec![self.error(format!("Failed to {}: {}", op.label(), error))]
            }
            Msg::LogChunk { pager, text, reader } => {
                let Some(layer) = self.pager_layer_mut(pager) else {
                    // Pager is gone; dropping the reader closes the stream.
                    return Vec::new();
                };
                layer.pager.append(&text);
                match &layer.cancel {
                    Some(cancel) if !cancel.is_cancelled() => vec![Cmd::ReadLogs {
                        pager,
                        reader,
                        cancel: cancel.clone(),
                    }],
                    _ => Vec::new(),
                }
            }
            Msg::LogEnded { pager, error } => {
                if let Some(layer) = self.pager_layer_mut(pager) {
                    tracing::debug!(pager, ?error, "log stream ended");
                    layer.pager.close_stream(error);
                }
                Vec::new()
            }
            Msg::StatSample { sink, sample, stream } => match sink {
                StatSink::Monitor(id) => {
                    let Some(cancel) = self.monitor.get(&id).cloned() else {
                        return Vec::new();
                    };
                    self.update_monitor_row(&id, |row| row.sample = Some(sample));
                    vec![Cmd::ReadStats {
                        sink: StatSink::Monitor(id),
                        stream,
                        cancel,
                    }]
                }
                StatSink::Pager(pager) => {
                    let Some(layer) = self.pager_layer_mut(pager) else {
                        return Vec::new();
                    };
                    layer.pager.append(&format!("{}\n", sample.describe()));
                    match &layer.cancel {
                        Some(cancel) if !cancel.is_cancelled() => vec![Cmd::ReadStats {
                            sink: StatSink::Pager(pager),
                            stream,
                            cancel: cancel.clone(),
                        }],
                        _ => Vec::new(),
                    }
                }
            },
            Msg::StatsEnded { sink, error } => {
                match sink {
                    StatSink::Monitor(id) => {
                        if self.monitor.remove(&id).is_some() {
                            tracing::debug!(%id, ?error, "stats stream ended");
                            let reason = error.unwrap_or_else(|| "ended".to_string());
                            self.update_monitor_row(&id, |row| row.ended = Some(reason));
                        }
                    }
                    StatSink::Pager(pager) => {
                        if let Some(layer) = self.pager_layer_mut(pager) {
                            layer.pager.close_stream(error);
                        }
                    }
                }
                Vec::new()
            }
            Msg::DaemonEvent { event, stream } => self.on_daemon_event(event, stream),
            Msg::EventsEnded { error } => {
                let text = match error {
                    Some(error) => format!("Event stream closed: {error}"),
                    None => "Event stream closed; automatic refresh is off".to_string(),
                };
                vec![self.error(text)]
            }
            Msg::DebounceElapsed => {
                let kinds = self.debouncer.flush();
                tracing::debug!(?kinds, view = ?self.view, "debounce flush");
                if kinds.iter().any(|kind| kind.affects(self.view)) {
                    self.request_load(self.view)
                } else {
                    Vec::new()
                }
            }
            Msg::StatusExpired(seq) => {
                if self.status.as_ref().is_some_and(|s| s.seq == seq) {
                    self.status = None;
                }
                Vec::new()
            }
        }
    }

    fn on_loaded(&mut self, view: ViewMode, scope: Option<crate::model::TaskScope>, rows: Vec<Row>) -> Vec<Cmd> {
        if view.is_task_view() && scope.as_ref() != self.task_scope.as_ref() {
            tracing::debug!(?view, "dropping tasks for another scope");
            return Vec::new();
        }
        self.loading.remove(&view);
        tracing::debug!(?view, rows = rows.len(), "loaded");

        let sorted = self.sorted.contains(&view);
        if let Some(table) = self.tables.get_mut(&view) {
            table.set_rows(rows);
            if sorted {
                table.sort_by_active_column();
            }
        }

        if self.stale.remove(&view) && view == self.view {
            return self.request_load(view);
        }
        Vec::new()
    }

    /// Diff the running set against current subscriptions: subscribe new
    /// containers, cancel vanished ones, keep the rest untouched.
    fn on_monitor_listed(&mut self, containers: Vec<ContainerInfo>) -> Vec<Cmd> {
        self.loading.remove(&ViewMode::Monitor);
        if self.view != ViewMode::Monitor {
            return Vec::new();
        }

        let mut previous: HashMap<String, MonitorRow> = self
            .tables
            .get(&ViewMode::Monitor)
            .map(|t| t.rows())
            .unwrap_or_default()
            .iter()
            .filter_map(|row| match row {
                Row::Monitor(m) => Some((m.id.clone(), m.clone())),
                _ => None,
            })
            .collect();

        let mut cmds = Vec::new();
        let mut rows = Vec::with_capacity(containers.len());
        for container in containers.into_iter().filter(ContainerInfo::is_running) {
            let row = match previous.remove(&container.id) {
                // A stream that ended stays ended while the container is listed.
                Some(mut row) if row.ended.is_some() || self.monitor.contains_key(&container.id) => {
                    row.name = container.name;
                    row
                }
                _ => {
                    let cancel = CancelToken::new();
                    self.monitor.insert(container.id.clone(), cancel.clone());
                    cmds.push(Cmd::OpenStats {
                        sink: StatSink::Monitor(container.id.clone()),
                        id: container.id.clone(),
                        cancel,
                    });
                    MonitorRow {
                        id: container.id,
                        name: container.name,
                        ..Default::default()
                    }
                }
            };
            rows.push(Row::Monitor(row));
        }

        for id in previous.keys() {
            if let Some(cancel) = self.monitor.remove(id) {
                tracing::debug!(%id, "container gone, cancelling stats");
                cancel.cancel();
            }
        }
        if !cmds.is_empty() {
            tracing::debug!(count = cmds.len(), "subscribing to stats");
        }

        let sorted = self.sorted.contains(&ViewMode::Monitor);
        if let Some(table) = self.tables.get_mut(&ViewMode::Monitor) {
            table.set_rows(rows);
            if sorted {
                table.sort_by_active_column();
            }
        }
        if self.stale.remove(&ViewMode::Monitor) {
            cmds.extend(self.request_load(ViewMode::Monitor));
        }
        cmds
    }

    /// Rows are snapshots, so a change means replacing the row set.
    fn update_monitor_row(&mut self, id: &str, change: impl FnOnce(&mut MonitorRow)) {
        let Some(table) = self.tables.get_mut(&ViewMode::Monitor) else {
            return;
        };
        let mut rows = table.rows().to_vec();
        let Some(Row::Monitor(row)) = rows.iter_mut().find(|r| r.id() == Some(id)) else {
            return;
        };
        change(row);
        table.set_rows(rows);
        if self.sorted.contains(&ViewMode::Monitor) {
            table.sort_by_active_column();
        }
    }

    fn on_daemon_event(&mut self, event: crate::model::DaemonEvent, stream: crate::runtime::EventStream) -> Vec<Cmd> {
        let mut cmds = vec![Cmd::ReadEvents(stream)];

        if let Some(kind) = ResourceKind::from_event_type(&event.kind) {
            if let Some(after) = self.debouncer.notify(kind) {
                cmds.push(Cmd::Timer {
                    after,
                    msg: Box::new(Msg::DebounceElapsed),
                });
            }
        }

        if let Some(super::Layer::Pager(layer)) = &mut self.layer {
            if layer.kind == PagerKind::Events {
                layer.pager.append(&format!("{}\n", event.describe()));
            }
        }
        if self.events.len() == EVENT_HISTORY {
            self.events.pop_front();
        }
        self.events.push_back(event);
        cmds
    }

    pub(super) fn on_overlay_result(&mut self, result: OverlayResult<Followup, Action>) -> Vec<Cmd> {
        let OverlayResult { tag, target, outcome } = result;
        match (tag, outcome) {
            (Followup::Menu, Outcome::Selected(action)) => self.run_action(action, target, None),
            (Followup::Confirm(op), Outcome::Confirmed) => {
                tracing::info!(op = %op.label(), "confirmed");
                vec![Cmd::Act(op)]
            }
            (Followup::Filter, Outcome::Value(pattern)) => {
                if let Some(table) = self.table_mut() {
                    table.set_filter(pattern.trim());
                }
                Vec::new()
            }
            (Followup::Scale, Outcome::Value(value)) => match value.trim().parse::<u64>() {
                Ok(replicas) => vec![Cmd::Act(Operation::ScaleService {
                    id: target.id,
                    replicas,
                })],
                Err(_) => vec![self.error(format!("Invalid replica count: {:?}", value.trim()))],
            },
            (Followup::Availability, Outcome::Value(value)) => match Availability::parse(&value) {
                Some(availability) => vec![Cmd::Act(Operation::SetNodeAvailability {
                    id: target.id,
                    availability,
                })],
                None => vec![self.error(format!(
                    "Invalid availability {:?}: expected active, pause or drain",
                    value.trim()
                ))],
            },
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Target;
    use crate::config::Config;
    use crate::model::{DaemonEvent, StatSample, TaskScope};
    use futures_util::stream;
    use std::time::Duration;

    fn app() -> App {
        let mut app = App::new(Config::default());
        app.update(Msg::Resize(120, 40));
        app
    }

    fn container(id: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.into(),
            name: format!("{id}-name"),
            state: "running".into(),
            ..Default::default()
        }
    }

    fn no_events() -> crate::runtime::EventStream {
        Box::pin(stream::empty())
    }

    fn no_stats() -> crate::runtime::StatStream {
        Box::pin(stream::empty())
    }

    fn event(kind: &str) -> DaemonEvent {
        DaemonEvent {
            kind: kind.into(),
            action: "start".into(),
            ..Default::default()
        }
    }

    fn count_loads(cmds: &[Cmd]) -> usize {
        cmds.iter().filter(|c| matches!(c, Cmd::Load { .. })).count()
    }

    #[test]
    fn init_loads_summary_events_and_containers() {
        let mut app = app();
        let cmds = app.init();
        assert!(matches!(
            cmds.as_slice(),
            [Cmd::Summary, Cmd::WatchEvents, Cmd::Load { view: ViewMode::Containers, .. }]
        ));
        assert!(app.is_loading(ViewMode::Containers));
    }

    #[test]
    fn hundred_events_arm_one_timer_and_flush_once() {
        let mut app = app();
        app.update(Msg::Loaded { view: ViewMode::Containers, scope: None, rows: vec![] });

        let mut timers = 0;
        for _ in 0..100 {
            let cmds = app.update(Msg::DaemonEvent { event: event("container"), stream: no_events() });
            timers += cmds.iter().filter(|c| matches!(c, Cmd::Timer { .. })).count();
            assert_eq!(count_loads(&cmds), 0);
        }
        assert_eq!(timers, 1);

        let cmds = app.update(Msg::DebounceElapsed);
        assert_eq!(count_loads(&cmds), 1);
        assert!(app.update(Msg::DebounceElapsed).is_empty());
    }

    #[test]
    fn background_kinds_do_not_reload() {
        let mut app = app();
        app.update(Msg::DaemonEvent { event: event("network"), stream: no_events() });
        assert!(app.update(Msg::DebounceElapsed).is_empty());
    }

    #[test]
    fn load_while_loading_is_deferred_until_landed() {
        let mut app = app();
        assert_eq!(count_loads(&app.init()), 1);
        assert_eq!(count_loads(&app.update(Msg::Key(crossterm::event::KeyEvent::from(
            crossterm::event::KeyCode::F(5)
        )))), 0);
        let cmds = app.update(Msg::Loaded { view: ViewMode::Containers, scope: None, rows: vec![] });
        assert_eq!(count_loads(&cmds), 1);
    }

    #[test]
    fn load_failure_keeps_rows_and_reports() {
        let mut app = app();
        app.init();
        app.update(Msg::Loaded {
            view: ViewMode::Containers,
            scope: None,
            rows: vec![Row::Container(container("a"))],
        });
        app.update(Msg::LoadFailed { view: ViewMode::Containers, error: "boom".into() });
        assert_eq!(app.active_table().map(|t| t.total_row_count()), Some(1));
        let status = app.status().map(|s| s.text.clone()).unwrap_or_default();
        assert!(status.contains("boom"));
    }

    #[test]
    fn monitor_subscribes_new_and_cancels_vanished() {
        let mut app = app();
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        assert_eq!(app.view(), ViewMode::Monitor);

        let cmds = app.update(Msg::MonitorListed(vec![container("a"), container("b")]));
        let tokens: Vec<CancelToken> = cmds
            .into_iter()
            .filter_map(|c| match c {
                Cmd::OpenStats { cancel, .. } => Some(cancel),
                _ => None,
            })
            .collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(app.monitored(), 2);

        let cmds = app.update(Msg::MonitorListed(vec![container("b"), container("c")]));
        assert_eq!(cmds.iter().filter(|c| matches!(c, Cmd::OpenStats { .. })).count(), 1);
        assert_eq!(app.monitored(), 2);
        assert_eq!(tokens.iter().filter(|t| t.is_cancelled()).count(), 1);

        // Leaving the monitor cancels every subscription before returning.
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('1'))));
        assert_eq!(app.monitored(), 0);
        assert!(tokens.iter().all(CancelToken::is_cancelled));
    }

    #[test]
    fn monitor_sample_updates_row_and_resubscribes() {
        let mut app = app();
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        app.update(Msg::MonitorListed(vec![container("a")]));

        let sample = StatSample { cpu_percent: 12.5, pids: 3, ..Default::default() };
        let cmds = app.update(Msg::StatSample {
            sink: StatSink::Monitor("a".into()),
            sample,
            stream: no_stats(),
        });
        assert!(matches!(cmds.as_slice(), [Cmd::ReadStats { .. }]));
        let columns = app.active_table().and_then(|t| t.selected()).map(|r| r.columns()).unwrap_or_default();
        assert_eq!(columns[2], "12.50%");

        app.update(Msg::StatsEnded { sink: StatSink::Monitor("a".into()), error: None });
        assert_eq!(app.monitored(), 0);
        let cmds = app.update(Msg::StatSample {
            sink: StatSink::Monitor("a".into()),
            sample: StatSample::default(),
            stream: no_stats(),
        });
        assert!(cmds.is_empty());
    }

    #[test]
    fn ended_monitor_stream_is_not_reopened_on_relist() {
        let mut app = app();
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        app.update(Msg::MonitorListed(vec![container("a")]));
        app.update(Msg::StatsEnded {
            sink: StatSink::Monitor("a".into()),
            error: Some("boom".into()),
        });

        let cmds = app.update(Msg::MonitorListed(vec![container("a")]));
        assert!(!cmds.iter().any(|c| matches!(c, Cmd::OpenStats { .. })));
        assert_eq!(app.monitored(), 0);
        let ended = match app.active_table().and_then(|t| t.selected()) {
            Some(Row::Monitor(row)) => row.ended.clone(),
            _ => None,
        };
        assert_eq!(ended.as_deref(), Some("boom"));

        // A new monitor session starts over.
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        let cmds = app.update(Msg::MonitorListed(vec![container("a")]));
        assert_eq!(cmds.iter().filter(|c| matches!(c, Cmd::OpenStats { .. })).count(), 1);
    }

    #[test]
    fn stale_monitor_ticks_are_ignored() {
        let mut app = app();
        let cmds = app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        let tick = cmds.into_iter().find_map(|c| match c {
            Cmd::Timer { msg, .. } => Some(*msg),
            _ => None,
        });
        let Some(Msg::MonitorTick(epoch)) = tick else {
            panic!("monitor timer expected");
        };
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('m'))));
        assert!(app.update(Msg::MonitorTick(epoch)).is_empty());
    }

    #[test]
    fn tasks_for_an_old_scope_are_dropped() {
        let mut app = app();
        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('6'))));
        app.update(Msg::Loaded {
            view: ViewMode::Services,
            scope: None,
            rows: vec![Row::Service(crate::model::ServiceInfo {
                id: "svc1".into(),
                name: "web".into(),
                ..Default::default()
            })],
        });
        let cmds = app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Enter)));
        assert_eq!(app.view(), ViewMode::ServiceTasks);
        assert!(matches!(
            cmds.as_slice(),
            [Cmd::Load { view: ViewMode::ServiceTasks, scope: Some(TaskScope::Service { .. }), .. }]
        ));

        let other = Some(TaskScope::Service { id: "svc2".into(), name: "api".into() });
        app.update(Msg::Loaded {
            view: ViewMode::ServiceTasks,
            scope: other,
            rows: vec![Row::Task(Default::default())],
        });
        assert_eq!(app.active_table().map(|t| t.total_row_count()), Some(0));

        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Esc)));
        assert_eq!(app.view(), ViewMode::Services);
    }

    #[test]
    fn scale_input_is_validated() {
        let mut app = app();
        let bad = OverlayResult {
            tag: Followup::Scale,
            target: Target::new("svc1", "web"),
            outcome: Outcome::Value("three".into()),
        };
        let cmds = app.on_overlay_result(bad);
        assert!(!cmds.iter().any(|c| matches!(c, Cmd::Act(_))));
        assert!(app.status().is_some());

        let good = OverlayResult {
            tag: Followup::Scale,
            target: Target::new("svc1", "web"),
            outcome: Outcome::Value(" 3 ".into()),
        };
        let cmds = app.on_overlay_result(good);
        assert!(matches!(
            cmds.as_slice(),
            [Cmd::Act(Operation::ScaleService { replicas: 3, .. })]
        ));
    }

    #[test]
    fn closing_log_pager_cancels_and_drops_late_chunks() {
        let mut app = app();
        app.init();
        app.update(Msg::Loaded {
            view: ViewMode::Containers,
            scope: None,
            rows: vec![Row::Container(container("a"))],
        });
        let cmds = app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('l'))));
        let Some(Cmd::OpenLogs { pager, cancel, .. }) = cmds.into_iter().next() else {
            panic!("log stream expected");
        };
        assert!(app.pager().is_some_and(|p| p.is_live()));

        let reader = crate::demux::LogReader::new(Box::pin(stream::empty()));
        let cmds = app.update(Msg::LogChunk { pager, text: "hello\n".into(), reader });
        assert!(matches!(cmds.as_slice(), [Cmd::ReadLogs { .. }]));
        assert_eq!(app.pager().map(|p| p.line_count()), Some(1));

        app.update(Msg::Key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('q'))));
        assert!(app.pager().is_none());
        assert!(cancel.is_cancelled());
        assert!(!app.should_quit());

        let reader = crate::demux::LogReader::new(Box::pin(stream::empty()));
        assert!(app.update(Msg::LogChunk { pager, text: "late\n".into(), reader }).is_empty());
    }

    #[test]
    fn status_expires_only_for_its_own_sequence() {
        let mut app = app();
        let first = app.update(Msg::OperationFailed { op: Operation::Prune, error: "x".into() });
        let Some(Cmd::Timer { after, msg }) = first.into_iter().next() else {
            panic!("status timer expected");
        };
        assert_eq!(after, Duration::from_secs(5));
        app.update(Msg::OperationFailed { op: Operation::Prune, error: "y".into() });
        app.update(*msg);
        assert!(app.status().is_some_and(|s| s.text.contains('y')));
    }
}
