use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::component::{Pager, PagerLine, PagerMode, StreamState};
use crate::theme;

use super::shared::{fit, safe_truncate_chars, write_line};

/// Full-screen pager: title, `height - 2` content lines, then the footer or
/// the search/filter prompt.
pub fn render_pager(out: &mut impl Write, pager: &Pager, width: usize, height: usize) -> io::Result<()> {
    let theme = theme::current();

    let state = match pager.stream_state() {
        StreamState::Static => String::new(),
        StreamState::Live if pager.follow() => " [LIVE, FOLLOW]".to_string(),
        StreamState::Live => " [LIVE]".to_string(),
        StreamState::Closed(None) => " [CLOSED]".to_string(),
        StreamState::Closed(Some(err)) => format!(" [CLOSED: {}]", err),
    };
    let mut title = format!(" {}{}  {} lines", pager.title(), state, pager.line_count());
    if !pager.filter().is_empty() {
        title.push_str(&format!("  filter \"{}\" ({})", pager.filter(), pager.visible_count()));
    }
    if !pager.search().is_empty() {
        title.push_str(&format!("  search \"{}\" ({} matches)", pager.search(), pager.matches().len()));
    }
    let title_color = match pager.stream_state() {
        StreamState::Closed(Some(_)) => theme.error,
        StreamState::Live if !pager.follow() => theme.warning,
        _ => theme.title,
    };
    queue!(out, SetForegroundColor(title_color), SetAttribute(Attribute::Bold))?;
    write_line(out, &title, width)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;

    let body = height.saturating_sub(2);
    let lines = pager.view();
    for line in lines.iter().take(body) {
        write_highlighted(out, line, width)?;
    }
    for _ in lines.len().min(body)..body {
        write!(out, "\r\n")?;
    }

    let footer = match pager.mode() {
        PagerMode::Searching => format!("/{}_", pager.input()),
        PagerMode::Filtering => format!("filter: {}_", pager.input()),
        PagerMode::Browsing => {
            "q/Esc: Close | ↑/↓ PgUp/PgDn g/G: Scroll | /: Search | n/N: Next/Prev | f: Filter | F: Follow"
                .to_string()
        }
    };
    let color = if pager.mode() == PagerMode::Browsing { theme.muted } else { theme.accent };
    queue!(out, SetForegroundColor(color))?;
    write!(out, "{}", fit(&footer, width))?;
    queue!(out, ResetColor)
}

fn write_highlighted(out: &mut impl Write, line: &PagerLine, width: usize) -> io::Result<()> {
    let theme = theme::current();
    if line.highlights.is_empty() {
        return write_line(out, &line.text, width);
    }
    // Highlights are byte ranges; only the part that fits is drawn.
    let shown = safe_truncate_chars(&line.text, width);
    let bg = if line.current { theme.current_match_bg } else { theme.match_bg };
    let mut pos = 0;
    for &(start, end) in &line.highlights {
        let end = end.min(shown.len());
        if start < pos || start >= end || !shown.is_char_boundary(start) || !shown.is_char_boundary(end) {
            continue;
        }
        write!(out, "{}", &shown[pos..start])?;
        queue!(out, SetBackgroundColor(bg), SetForegroundColor(theme.selection_fg))?;
        write!(out, "{}", &shown[start..end])?;
        queue!(out, ResetColor)?;
        pos = end;
    }
    write!(out, "{}", &shown[pos..])?;
    let used = shown.chars().count();
    write!(out, "{}\r\n", " ".repeat(width.saturating_sub(used)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_reports_stream_state() {
        let mut pager = Pager::live("Logs: web", 100);
        pager.close_stream(Some("gone".into()));
        let mut buf = Vec::new();
        render_pager(&mut buf, &pager, 80, 10).unwrap();
        assert!(String::from_utf8_lossy(&buf).contains("[CLOSED: gone]"));
    }

    #[test]
    fn highlighted_line_keeps_text_intact() {
        let line = PagerLine {
            text: "error here".into(),
            highlights: vec![(0, 5)],
            current: true,
        };
        let mut buf = Vec::new();
        write_highlighted(&mut buf, &line, 20).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("error"));
        assert!(text.contains(" here"));
    }
}
