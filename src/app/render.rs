use std::io::{self, Write};

use crossterm::{cursor::MoveTo, queue, terminal::Clear, terminal::ClearType};

use crate::model::ViewMode;
use crate::view::Presenter;

use super::{App, Layer, StatusLevel};

/// Draw one frame to stdout.
pub fn render(app: &App) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    draw(&mut out, app)?;
    out.flush()
}

pub(super) fn draw(out: &mut impl Write, app: &App) -> io::Result<()> {
    let (cols, rows) = app.size();
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    if Presenter::render_size_guard(out, cols, rows)? {
        return Ok(());
    }
    let width = cols as usize;
    let height = rows as usize;

    if let Some(Layer::Pager(layer)) = app.layer() {
        return Presenter::render_pager(out, &layer.pager, width, height);
    }

    if app.show_header() {
        Presenter::render_header(out, app.summary(), width)?;
    }

    let view = app.view();
    let extra = match view {
        ViewMode::DiskUsage | ViewMode::Monitor => Some(view.title().to_string()),
        _ if view.is_task_view() => app
            .task_scope()
            .map(|scope| scope.label())
            .or_else(|| Some(view.title().to_string())),
        _ => None,
    };
    let mut counter = match app.active_table() {
        Some(table) if table.row_count() != table.total_row_count() => {
            format!("{}/{}", table.row_count(), table.total_row_count())
        }
        Some(table) => table.total_row_count().to_string(),
        None => String::new(),
    };
    if app.is_loading(view) {
        counter.push_str(" loading…");
    }
    counter.push(' ');
    Presenter::render_tab_bar(out, view, extra.as_deref(), &counter, width)?;

    if let Some(table) = app.active_table() {
        let empty = if app.is_loading(view) { "" } else { empty_message(view, table.filter()) };
        Presenter::render_table(out, &table.view(), width, app.body_height(), empty)?;
    }

    match app.status() {
        Some(status) => Presenter::render_status(out, &status.text, status.level == StatusLevel::Error, width)?,
        None => Presenter::render_status(out, "", false, width)?,
    }
    Presenter::render_footer(out, footer_hints(view), width)?;

    if let Some(overlay) = app.overlay() {
        Presenter::render_overlay(out, overlay, width, height)?;
    }
    Ok(())
}

fn empty_message(view: ViewMode, filter: &str) -> &'static str {
    if !filter.is_empty() {
        return "  No rows match the filter";
    }
    match view {
        ViewMode::Nodes | ViewMode::Services | ViewMode::Stacks => "  Nothing to show (is this node a swarm manager?)",
        ViewMode::Monitor => "  No running containers",
        _ => "  Nothing to show",
    }
}

fn footer_hints(view: ViewMode) -> &'static str {
    match view {
        ViewMode::Containers => {
            " Enter: Menu | l: Logs | i: Inspect | s: Stats | ^k: Kill | ^e: Remove | F2: All | %: Filter | ?: Help"
        }
        ViewMode::Images => " Enter: Menu | i: Inspect | ^e: Remove | ^f: Force | ^d: Dangling | %: Filter | ?: Help",
        ViewMode::Networks | ViewMode::Volumes => " i: Inspect | ^e: Remove | %: Filter | F5: Refresh | ?: Help",
        ViewMode::DiskUsage => " ^p: Prune | F5: Refresh | Esc: Back | ?: Help",
        ViewMode::Monitor => " l: Logs | s: Stats | i: Inspect | m: Stop monitor | ?: Help",
        ViewMode::Nodes => " Enter: Tasks | i: Inspect | ^a: Availability | %: Filter | ?: Help",
        ViewMode::Services => " Enter: Tasks | i: Inspect | l: Logs | ^s: Scale | ^u: Update | ^r: Remove | ?: Help",
        ViewMode::Stacks => " Enter: Tasks | ^r: Remove | %: Filter | ?: Help",
        _ => " i: Inspect | Esc: Back | %: Filter | F5: Refresh | ?: Help",
    }
}
