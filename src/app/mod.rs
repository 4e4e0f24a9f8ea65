//! The application state machine.
//!
//! [`App::update`] handles one [`Msg`] at a time and returns the [`Cmd`]s it
//! wants run. Commands are executed by [`perform`] as independent tasks, and
//! each one eventually sends exactly one message back. Nothing but `update`
//! mutates the state, so no locks are needed.

mod debounce;
mod effects;
mod event_loop;
mod input;
mod render;
mod update;
mod views;

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crossterm::event::KeyEvent;

use crate::cancel::CancelToken;
use crate::component::{Overlay, Pager, Table};
use crate::config::Config;
use crate::demux::LogReader;
use crate::model::{
    ContainerInfo, DaemonEvent, DaemonSummary, InspectKind, Row, StatSample, TaskScope, ViewMode,
};
use crate::runtime::{EventStream, LogRequest, Operation, StatStream};

pub use debounce::Debouncer;
pub use effects::{execute, perform};
pub use event_loop::{restore_terminal, run};

/// Daemon events kept for the events pager.
pub const EVENT_HISTORY: usize = 500;

/// Everything the state machine reacts to.
pub enum Msg {
    Key(KeyEvent),
    Resize(u16, u16),
    Summary(DaemonSummary),
    SummaryFailed(String),
    Loaded {
        view: ViewMode,
        scope: Option<TaskScope>,
        rows: Vec<Row>,
    },
    LoadFailed {
        view: ViewMode,
        error: String,
    },
    MonitorListed(Vec<ContainerInfo>),
    MonitorTick(u64),
    TextLoaded {
        title: String,
        text: String,
    },
    TextFailed {
        title: String,
        error: String,
    },
    OperationDone {
        op: Operation,
        detail: String,
    },
    OperationFailed {
        op: Operation,
        error: String,
    },
    LogChunk {
        pager: u64,
        text: String,
        reader: LogReader,
    },
    LogEnded {
        pager: u64,
        error: Option<String>,
    },
    StatSample {
        sink: StatSink,
        sample: StatSample,
        stream: StatStream,
    },
    StatsEnded {
        sink: StatSink,
        error: Option<String>,
    },
    DaemonEvent {
        event: DaemonEvent,
        stream: EventStream,
    },
    EventsEnded {
        error: Option<String>,
    },
    DebounceElapsed,
    StatusExpired(u64),
}

/// Work for the executor. Each command produces exactly one [`Msg`].
pub enum Cmd {
    Summary,
    Load {
        view: ViewMode,
        all: bool,
        scope: Option<TaskScope>,
    },
    /// Running containers for the monitor view.
    ListMonitor,
    Inspect {
        kind: InspectKind,
        id: String,
        title: String,
    },
    Info,
    Act(Operation),
    OpenLogs {
        pager: u64,
        request: LogRequest,
        cancel: CancelToken,
    },
    ReadLogs {
        pager: u64,
        reader: LogReader,
        cancel: CancelToken,
    },
    OpenStats {
        sink: StatSink,
        id: String,
        cancel: CancelToken,
    },
    ReadStats {
        sink: StatSink,
        stream: StatStream,
        cancel: CancelToken,
    },
    WatchEvents,
    ReadEvents(EventStream),
    Timer {
        after: Duration,
        msg: Box<Msg>,
    },
}

/// Who receives a stats sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatSink {
    /// A monitor row, by container id.
    Monitor(String),
    /// A stats pager, by pager id.
    Pager(u64),
}

/// What to do with an overlay's result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Followup {
    Menu,
    Confirm(Operation),
    Filter,
    Scale,
    Availability,
}

/// Resource actions reachable from keys and menus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Logs,
    Inspect,
    Stats,
    Kill,
    Stop,
    Restart,
    Remove,
    ForceRemove,
    RemoveStopped,
    RemoveDangling,
    Prune,
    Tasks,
    SetAvailability,
    Scale,
    ForceUpdate,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Logs => "Logs",
            Action::Inspect => "Inspect",
            Action::Stats => "Stats",
            Action::Kill => "Kill",
            Action::Stop => "Stop",
            Action::Restart => "Restart",
            Action::Remove => "Remove",
            Action::ForceRemove => "Force remove",
            Action::RemoveStopped => "Remove all stopped",
            Action::RemoveDangling => "Remove dangling",
            Action::Prune => "Prune",
            Action::Tasks => "Tasks",
            Action::SetAvailability => "Set availability",
            Action::Scale => "Scale",
            Action::ForceUpdate => "Force update",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub level: StatusLevel,
    seq: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagerKind {
    Text,
    Logs,
    Stats,
    Events,
}

pub struct PagerLayer {
    pub id: u64,
    pub kind: PagerKind,
    pub pager: Pager,
    cancel: Option<CancelToken>,
}

/// The single slot above the active view.
pub enum Layer {
    Prompt(Overlay<Followup, Action>),
    Pager(PagerLayer),
}

pub struct App {
    config: Config,
    view: ViewMode,
    /// Where `Esc` in a task view returns to.
    previous: ViewMode,
    tables: HashMap<ViewMode, Table<Row>>,
    task_scope: Option<TaskScope>,
    layer: Option<Layer>,
    debouncer: Debouncer,
    loading: HashSet<ViewMode>,
    /// Views that need another load once the one in flight lands.
    stale: HashSet<ViewMode>,
    /// Views whose rows are re-sorted by the active column on every load.
    sorted: HashSet<ViewMode>,
    show_all: bool,
    show_header: bool,
    summary: Option<DaemonSummary>,
    status: Option<Status>,
    status_seq: u64,
    next_pager_id: u64,
    monitor: HashMap<String, CancelToken>,
    monitor_epoch: u64,
    events: VecDeque<DaemonEvent>,
    size: (u16, u16),
    quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let tables = ViewMode::ALL
            .iter()
            .map(|&view| (view, Table::new(views::columns(view))))
            .collect();
        Self {
            debouncer: Debouncer::new(config.debounce),
            show_all: config.show_all,
            show_header: config.show_header,
            config,
            view: ViewMode::Containers,
            previous: ViewMode::Containers,
            tables,
            task_scope: None,
            layer: None,
            loading: HashSet::new(),
            stale: HashSet::new(),
            sorted: HashSet::new(),
            summary: None,
            status: None,
            status_seq: 0,
            next_pager_id: 0,
            monitor: HashMap::new(),
            monitor_epoch: 0,
            events: VecDeque::new(),
            size: (0, 0),
            quit: false,
        }
    }

    /// Commands to run once at startup.
    pub fn init(&mut self) -> Vec<Cmd> {
        let mut cmds = vec![Cmd::Summary, Cmd::WatchEvents];
        cmds.extend(self.request_load(self.view));
        cmds
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn table(&self, view: ViewMode) -> Option<&Table<Row>> {
        self.tables.get(&view)
    }

    pub fn active_table(&self) -> Option<&Table<Row>> {
        self.tables.get(&self.view)
    }

    pub fn layer(&self) -> Option<&Layer> {
        self.layer.as_ref()
    }

    pub fn overlay(&self) -> Option<&Overlay<Followup, Action>> {
        match &self.layer {
            Some(Layer::Prompt(overlay)) => Some(overlay),
            _ => None,
        }
    }

    pub fn pager(&self) -> Option<&Pager> {
        match &self.layer {
            Some(Layer::Pager(layer)) => Some(&layer.pager),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn summary(&self) -> Option<&DaemonSummary> {
        self.summary.as_ref()
    }

    pub fn task_scope(&self) -> Option<&TaskScope> {
        self.task_scope.as_ref()
    }

    pub fn events(&self) -> impl Iterator<Item = &DaemonEvent> {
        self.events.iter()
    }

    pub fn show_header(&self) -> bool {
        self.show_header
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn is_loading(&self, view: ViewMode) -> bool {
        self.loading.contains(&view)
    }

    /// Containers with a live stats subscription.
    pub fn monitored(&self) -> usize {
        self.monitor.len()
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) -> Cmd {
        self.status_seq += 1;
        let text = text.into();
        match level {
            StatusLevel::Info => tracing::info!(status = %text),
            StatusLevel::Error => tracing::warn!(status = %text),
        }
        self.status = Some(Status {
            text,
            level,
            seq: self.status_seq,
        });
        Cmd::Timer {
            after: self.config.status_ttl,
            msg: Box::new(Msg::StatusExpired(self.status_seq)),
        }
    }

    fn info(&mut self, text: impl Into<String>) -> Cmd {
        self.set_status(StatusLevel::Info, text)
    }

    fn error(&mut self, text: impl Into<String>) -> Cmd {
        self.set_status(StatusLevel::Error, text)
    }

    /// Put a pager on top, closing whatever stream the previous one had.
    fn open_pager(&mut self, kind: PagerKind, pager: Pager, cancel: Option<CancelToken>) -> u64 {
        self.close_layer();
        self.next_pager_id += 1;
        let (width, height) = self.pager_size();
        let mut pager = pager;
        pager.set_size(width, height);
        self.layer = Some(Layer::Pager(PagerLayer {
            id: self.next_pager_id,
            kind,
            pager,
            cancel,
        }));
        self.next_pager_id
    }

    fn close_layer(&mut self) {
        if let Some(Layer::Pager(layer)) = self.layer.take() {
            if let Some(cancel) = layer.cancel {
                tracing::debug!(pager = layer.id, "closing pager stream");
                cancel.cancel();
            }
        }
    }

    /// The pager with `id`, if it is still the one on screen.
    fn pager_layer_mut(&mut self, id: u64) -> Option<&mut PagerLayer> {
        match &mut self.layer {
            Some(Layer::Pager(layer)) if layer.id == id => Some(layer),
            _ => None,
        }
    }
}
