use std::io::{self, Write};

use crossterm::{
    queue,
    style::{ResetColor, SetBackgroundColor, SetForegroundColor},
};

use crate::model::{DaemonSummary, ViewMode};
use crate::theme;

use super::shared::{fit, truncate_str};

pub fn render_header(out: &mut impl Write, summary: Option<&DaemonSummary>, width: usize) -> io::Result<()> {
    let text = match summary {
        Some(s) => format!(
            " Docker {} (API {})  {}/{}  host {}  swarm {}  containers {}/{}  images {}",
            s.version,
            s.api_version,
            s.os,
            s.arch,
            s.host,
            s.swarm_role,
            s.containers_running,
            s.containers_total,
            s.images,
        ),
        None => " Docker ...".to_string(),
    };
    queue!(out, SetForegroundColor(theme::current().muted))?;
    write!(out, "{}", fit(&text, width))?;
    queue!(out, ResetColor)?;
    write!(out, "\r\n")
}

/// Numbered tabs, the active unnumbered view (if any) and a right-aligned
/// row counter.
pub fn render_tab_bar(
    out: &mut impl Write,
    current: ViewMode,
    extra: Option<&str>,
    counter: &str,
    width: usize,
) -> io::Result<()> {
    let theme = theme::current();
    let mut used = 0;

    for (idx, view) in ViewMode::NUMBERED.iter().enumerate() {
        let label = format!(" {}:{} ", idx + 1, view.title());
        if used + label.chars().count() + counter.len() + 1 > width {
            break;
        }
        if *view == current {
            queue!(out, SetBackgroundColor(theme.tab_active_bg), SetForegroundColor(theme.tab_active_fg))?;
        } else {
            queue!(out, SetForegroundColor(theme.muted))?;
        }
        write!(out, "{}", label)?;
        queue!(out, ResetColor)?;
        used += label.chars().count();
    }

    if let Some(extra) = extra {
        let room = width.saturating_sub(used + counter.len() + 2);
        if room > 3 {
            let label = truncate_str(&format!(" {} ", extra), room);
            write!(out, " ")?;
            queue!(out, SetBackgroundColor(theme.tab_active_bg), SetForegroundColor(theme.tab_active_fg))?;
            write!(out, "{}", label)?;
            queue!(out, ResetColor)?;
            used += 1 + label.chars().count();
        }
    }

    let pad = width.saturating_sub(used + counter.chars().count());
    write!(out, "{}", " ".repeat(pad))?;
    queue!(out, SetForegroundColor(theme.muted))?;
    write!(out, "{}", counter)?;
    queue!(out, ResetColor)?;
    write!(out, "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_bar_marks_extra_view() {
        let mut buf = Vec::new();
        render_tab_bar(&mut buf, ViewMode::DiskUsage, Some("Disk Usage"), "3/3", 120).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("1:Containers"));
        assert!(text.contains("Disk Usage"));
        assert!(text.contains("3/3"));
    }

    #[test]
    fn header_without_summary_is_a_placeholder() {
        let mut buf = Vec::new();
        render_header(&mut buf, None, 40).unwrap();
        assert!(String::from_utf8_lossy(&buf).contains("Docker ..."));
    }
}
