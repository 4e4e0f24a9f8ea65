mod header;
mod overlay;
mod pager;
mod shared;
mod table;

use std::io::{self, Write};

use crossterm::{
    cursor, queue,
    style::{ResetColor, SetForegroundColor},
    terminal,
};

use crate::component::{Overlay, Pager, TableView};
use crate::model::{DaemonSummary, ViewMode};
use crate::theme;

pub use shared::{fit, format_age, format_bytes, safe_truncate_chars, truncate_str};

pub struct Presenter;

/// Minimum terminal dimensions for usable rendering.
pub const MIN_COLS: u16 = 60;
pub const MIN_ROWS: u16 = 10;

impl Presenter {
    /// Check if the terminal is large enough. If not, render a "too small"
    /// message and return `true` (meaning "skip normal rendering").
    pub fn render_size_guard(out: &mut impl Write, cols: u16, rows: u16) -> io::Result<bool> {
        if cols >= MIN_COLS && rows >= MIN_ROWS {
            return Ok(false);
        }
        queue!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;
        let msg = format!(
            "Terminal too small ({}x{}). Resize to at least {}x{}.",
            cols, rows, MIN_COLS, MIN_ROWS
        );
        let y = rows / 2;
        let x = cols.saturating_sub(msg.len() as u16) / 2;
        queue!(out, cursor::MoveTo(x, y), SetForegroundColor(theme::current().warning))?;
        write!(out, "{}", truncate_str(&msg, cols as usize))?;
        queue!(out, ResetColor)?;
        Ok(true)
    }

    pub fn render_header(out: &mut impl Write, summary: Option<&DaemonSummary>, width: usize) -> io::Result<()> {
        header::render_header(out, summary, width)
    }

    pub fn render_tab_bar(
        out: &mut impl Write,
        current: ViewMode,
        extra: Option<&str>,
        counter: &str,
        width: usize,
    ) -> io::Result<()> {
        header::render_tab_bar(out, current, extra, counter, width)
    }

    pub fn render_table(
        out: &mut impl Write,
        view: &TableView,
        width: usize,
        height: usize,
        empty_message: &str,
    ) -> io::Result<()> {
        table::render_table(out, view, width, height, empty_message)
    }

    pub fn render_pager(out: &mut impl Write, pager: &Pager, width: usize, height: usize) -> io::Result<()> {
        pager::render_pager(out, pager, width, height)
    }

    pub fn render_overlay<T, A: Clone>(
        out: &mut impl Write,
        overlay: &Overlay<T, A>,
        width: usize,
        height: usize,
    ) -> io::Result<()> {
        overlay::render_overlay(out, overlay, width, height)
    }

    /// One status line; errors in the error colour, everything else in the
    /// ok colour. An empty status still takes the line.
    pub fn render_status(out: &mut impl Write, text: &str, is_error: bool, width: usize) -> io::Result<()> {
        let theme = theme::current();
        let color = if is_error { theme.error } else { theme.ok };
        queue!(out, SetForegroundColor(color))?;
        shared::write_line(out, text, width)?;
        queue!(out, ResetColor)
    }

    pub fn render_footer(out: &mut impl Write, hints: &str, width: usize) -> io::Result<()> {
        queue!(out, SetForegroundColor(theme::current().muted))?;
        write!(out, "{}", fit(hints, width))?;
        queue!(out, ResetColor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_guard_only_triggers_below_minimum() {
        let mut buf = Vec::new();
        assert!(Presenter::render_size_guard(&mut buf, 40, 20).unwrap());
        assert!(String::from_utf8_lossy(&buf).contains("too small"));

        let mut buf = Vec::new();
        assert!(!Presenter::render_size_guard(&mut buf, 80, 24).unwrap());
        assert!(buf.is_empty());
    }
}
