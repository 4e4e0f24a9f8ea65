//! End-to-end flows through the state machine and the effect executor,
//! against an in-memory runtime.

use std::sync::Mutex;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures_util::stream;

use berth::app::{execute, App, Cmd, Msg, StatusLevel};
use berth::component::{OverlayKind, TableRow};
use berth::config::Config;
use berth::error::{Result, RuntimeError};
use berth::model::{
    ContainerInfo, DaemonEvent, DaemonSummary, DiskUsage, ImageInfo, InspectKind, NetworkInfo,
    NodeInfo, Row, ServiceInfo, TaskInfo, TaskScope, ViewMode, VolumeInfo,
};
use berth::runtime::{ByteStream, EventStream, LogRequest, Operation, Runtime, StatStream};

/// Serves a fixed container list and records every operation it is asked
/// to run.
struct FakeRuntime {
    containers: Vec<ContainerInfo>,
    executed: Mutex<Vec<Operation>>,
}

impl FakeRuntime {
    fn new(names: &[&str]) -> Self {
        let containers = names
            .iter()
            .enumerate()
            .map(|(i, name)| ContainerInfo {
                id: format!("{i:012}"),
                name: name.to_string(),
                image: format!("{name}:latest"),
                state: "running".into(),
                status: "Up 1 minute".into(),
                ..Default::default()
            })
            .collect();
        Self {
            containers,
            executed: Mutex::new(Vec::new()),
        }
    }

    fn executed(&self) -> Vec<Operation> {
        self.executed.lock().unwrap().clone()
    }
}

impl Runtime for FakeRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
    async fn summary(&self) -> Result<DaemonSummary> {
        Ok(DaemonSummary {
            version: "27.0.0".into(),
            containers_total: self.containers.len() as i64,
            ..Default::default()
        })
    }
    async fn info_json(&self) -> Result<String> {
        Ok("{}".into())
    }
    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerInfo>> {
        Ok(self.containers.clone())
    }
    async fn list_images(&self) -> Result<Vec<ImageInfo>> {
        Ok(Vec::new())
    }
    async fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
        Ok(Vec::new())
    }
    async fn list_volumes(&self) -> Result<Vec<VolumeInfo>> {
        Ok(Vec::new())
    }
    async fn disk_usage(&self) -> Result<DiskUsage> {
        Ok(DiskUsage::default())
    }
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        Err(RuntimeError::Invalid("This node is not a swarm manager".into()))
    }
    async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        Ok(Vec::new())
    }
    async fn tasks_of(&self, _scope: &TaskScope) -> Result<Vec<TaskInfo>> {
        Ok(Vec::new())
    }
    async fn inspect(&self, _kind: InspectKind, id: &str) -> Result<String> {
        Ok(format!("{{\"Id\": \"{id}\"}}"))
    }
    fn logs(&self, _request: &LogRequest) -> ByteStream {
        Box::pin(stream::empty())
    }
    fn stats(&self, _id: &str) -> StatStream {
        Box::pin(stream::empty())
    }
    fn events(&self) -> EventStream {
        Box::pin(stream::empty())
    }
    async fn execute(&self, op: &Operation) -> Result<String> {
        self.executed.lock().unwrap().push(op.clone());
        Ok(String::new())
    }
}

fn key(code: KeyCode) -> Msg {
    Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

/// Feed `msg` to the app and return the commands it asks for.
fn drive(app: &mut App, msg: Msg) -> Vec<Cmd> {
    app.update(msg)
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        drive(app, key(KeyCode::Char(c)));
    }
}

/// An app showing the fake's containers, with the initial load completed
/// through the executor.
async fn loaded_app(runtime: &FakeRuntime) -> App {
    let mut app = App::new(Config::default());
    app.update(Msg::Resize(120, 40));
    for cmd in app.init() {
        if matches!(cmd, Cmd::Load { .. }) {
            let msg = execute(runtime, cmd).await;
            drive(&mut app, msg);
        }
    }
    app
}

fn count_loads(cmds: &[Cmd]) -> usize {
    cmds.iter().filter(|c| matches!(c, Cmd::Load { .. })).count()
}

#[tokio::test]
async fn initial_load_fills_the_container_table() {
    let runtime = FakeRuntime::new(&["web", "db", "cache"]);
    let app = loaded_app(&runtime).await;

    let table = app.active_table().unwrap();
    assert_eq!(table.total_row_count(), 3);
    assert!(!app.is_loading(ViewMode::Containers));
    assert_eq!(table.selected().and_then(|r| r.id()), Some("000000000000"));
}

#[tokio::test]
async fn filter_narrows_rows_without_dropping_data() {
    let runtime = FakeRuntime::new(&["nginx-front", "postgres", "nginx-admin", "redis", "worker"]);
    let mut app = loaded_app(&runtime).await;

    drive(&mut app, key(KeyCode::Char('%')));
    assert!(matches!(app.overlay().map(|o| o.kind()), Some(OverlayKind::Input { .. })));
    type_text(&mut app, "nginx");
    drive(&mut app, key(KeyCode::Enter));

    assert!(app.overlay().is_none());
    let table = app.active_table().unwrap();
    assert_eq!(table.filter(), "nginx");
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.total_row_count(), 5);

    // An empty filter brings everything back.
    drive(&mut app, key(KeyCode::Char('%')));
    for _ in 0.."nginx".len() {
        drive(&mut app, key(KeyCode::Backspace));
    }
    drive(&mut app, key(KeyCode::Enter));
    assert_eq!(app.active_table().unwrap().row_count(), 5);
}

#[tokio::test]
async fn key_queued_behind_filter_enter_sees_the_filter_applied() {
    let runtime = FakeRuntime::new(&["nginx-front", "postgres", "nginx-admin"]);
    let mut app = loaded_app(&runtime).await;

    drive(&mut app, key(KeyCode::Char('%')));
    type_text(&mut app, "nginx");
    // Both keys arrive in the same drained batch.
    let mut cmds = drive(&mut app, key(KeyCode::Enter));
    cmds.extend(drive(&mut app, key(KeyCode::Char('2'))));

    assert_eq!(app.view(), ViewMode::Images);
    let containers = app.table(ViewMode::Containers).unwrap();
    assert_eq!(containers.filter(), "nginx");
    assert_eq!(containers.row_count(), 2);
    assert_eq!(app.table(ViewMode::Images).unwrap().filter(), "");
    assert_eq!(count_loads(&cmds), 1);
}

#[tokio::test]
async fn confirmed_kill_targets_the_original_row_when_a_key_follows() {
    let runtime = FakeRuntime::new(&["web", "db"]);
    let mut app = loaded_app(&runtime).await;
    drive(&mut app, key(KeyCode::Down));
    drive(&mut app, Msg::Key(KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL)));
    assert!(matches!(app.overlay().map(|o| o.kind()), Some(OverlayKind::Confirm { .. })));

    let mut cmds = drive(&mut app, key(KeyCode::Char('y')));
    cmds.extend(drive(&mut app, key(KeyCode::Up)));
    cmds.extend(drive(&mut app, key(KeyCode::Char('3'))));
    assert_eq!(app.view(), ViewMode::Networks);

    let acts: Vec<Cmd> = cmds.into_iter().filter(|c| matches!(c, Cmd::Act(_))).collect();
    assert_eq!(acts.len(), 1);
    for act in acts {
        execute(&runtime, act).await;
    }
    assert_eq!(runtime.executed(), vec![Operation::KillContainer("000000000001".into())]);
}

#[tokio::test]
async fn kill_from_menu_runs_exactly_one_operation_after_confirmation() {
    let runtime = FakeRuntime::new(&["web", "db"]);
    let mut app = loaded_app(&runtime).await;
    drive(&mut app, key(KeyCode::Down));

    assert!(drive(&mut app, key(KeyCode::Enter)).is_empty());
    let kill_at = match app.overlay().map(|o| o.kind()) {
        Some(OverlayKind::Menu(menu)) => menu
            .items()
            .iter()
            .position(|item| item.label == "Kill")
            .unwrap(),
        _ => panic!("action menu expected"),
    };
    for _ in 0..kill_at {
        drive(&mut app, key(KeyCode::Down));
    }
    assert!(drive(&mut app, key(KeyCode::Enter)).is_empty());
    assert!(matches!(app.overlay().map(|o| o.kind()), Some(OverlayKind::Confirm { .. })));
    assert!(runtime.executed().is_empty());

    let cmds = drive(&mut app, key(KeyCode::Char('y')));
    assert!(app.overlay().is_none());
    let mut acts: Vec<Cmd> = cmds.into_iter().filter(|c| matches!(c, Cmd::Act(_))).collect();
    assert_eq!(acts.len(), 1);

    let msg = execute(&runtime, acts.remove(0)).await;
    assert_eq!(runtime.executed(), vec![Operation::KillContainer("000000000001".into())]);

    let cmds = drive(&mut app, msg);
    let status = app.status().unwrap();
    assert_eq!(status.level, StatusLevel::Info);
    assert!(status.text.starts_with("Killed container"));
    assert_eq!(count_loads(&cmds), 1);
}

#[tokio::test]
async fn declining_confirmation_runs_nothing() {
    let runtime = FakeRuntime::new(&["web"]);
    let mut app = loaded_app(&runtime).await;

    drive(&mut app, Msg::Key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL)));
    assert!(app.overlay().is_some());
    let cmds = drive(&mut app, key(KeyCode::Char('n')));
    assert!(app.overlay().is_none());
    assert!(!cmds.iter().any(|c| matches!(c, Cmd::Act(_))));
}

#[tokio::test]
async fn event_burst_triggers_a_single_reload() {
    let runtime = FakeRuntime::new(&["web"]);
    let mut app = loaded_app(&runtime).await;

    let mut timers = 0;
    for i in 0..100 {
        let event = DaemonEvent {
            time: 1_700_000_000 + i,
            kind: "container".into(),
            action: "start".into(),
            actor_id: "000000000000".into(),
            actor_name: "web".into(),
        };
        let cmds = drive(&mut app, Msg::DaemonEvent { event, stream: runtime.events() });
        timers += cmds.iter().filter(|c| matches!(c, Cmd::Timer { .. })).count();
        assert_eq!(count_loads(&cmds), 0);
    }
    assert_eq!(timers, 1);

    let cmds = drive(&mut app, Msg::DebounceElapsed);
    assert_eq!(count_loads(&cmds), 1);
    assert_eq!(app.events().count(), 100);
}

#[tokio::test]
async fn prompt_holds_focus_until_dismissed() {
    let runtime = FakeRuntime::new(&["web", "db"]);
    let mut app = loaded_app(&runtime).await;

    drive(&mut app, key(KeyCode::Enter));
    assert!(app.overlay().is_some());
    for code in [KeyCode::Char('3'), KeyCode::Char('m'), KeyCode::F(8)] {
        drive(&mut app, key(code));
        assert_eq!(app.view(), ViewMode::Containers);
    }
    drive(&mut app, key(KeyCode::Esc));
    assert!(app.overlay().is_none());
    assert!(!app.should_quit());

    drive(&mut app, key(KeyCode::Char('3')));
    assert_eq!(app.view(), ViewMode::Networks);
}

#[tokio::test]
async fn swarm_errors_become_a_status_message() {
    let runtime = FakeRuntime::new(&[]);
    let mut app = loaded_app(&runtime).await;

    let cmds = drive(&mut app, key(KeyCode::Char('5')));
    assert_eq!(app.view(), ViewMode::Nodes);
    let load = cmds.into_iter().find(|c| matches!(c, Cmd::Load { .. })).unwrap();
    let msg = execute(&runtime, load).await;
    assert!(matches!(msg, Msg::LoadFailed { view: ViewMode::Nodes, .. }));

    drive(&mut app, msg);
    let status = app.status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert!(status.text.contains("swarm manager"));
    assert!(!app.is_loading(ViewMode::Nodes));
}

#[tokio::test]
async fn inspect_opens_a_pager_with_the_document() {
    let runtime = FakeRuntime::new(&["web"]);
    let mut app = loaded_app(&runtime).await;

    let cmds = drive(&mut app, key(KeyCode::Char('i')));
    let inspect = cmds.into_iter().find(|c| matches!(c, Cmd::Inspect { .. })).unwrap();
    let msg = execute(&runtime, inspect).await;
    drive(&mut app, msg);

    let pager = app.pager().unwrap();
    assert!(pager.line_count() >= 1);
    drive(&mut app, key(KeyCode::Char('q')));
    assert!(app.pager().is_none());
    assert!(!app.should_quit());
}

#[tokio::test]
async fn monitor_is_listed_rather_than_loaded() {
    let runtime = FakeRuntime::new(&["web"]);
    let mut app = loaded_app(&runtime).await;

    let cmds = drive(&mut app, key(KeyCode::Char('m')));
    assert!(cmds.iter().any(|c| matches!(c, Cmd::ListMonitor)));
    assert_eq!(count_loads(&cmds), 0);

    let msg = execute(&runtime, Cmd::Load { view: ViewMode::Monitor, all: false, scope: None }).await;
    assert!(matches!(msg, Msg::LoadFailed { view: ViewMode::Monitor, .. }));
}

#[test]
fn rows_expose_the_container_id() {
    let row = Row::Container(ContainerInfo {
        id: "abc".into(),
        ..Default::default()
    });
    assert_eq!(row.id(), Some("abc"));
}
