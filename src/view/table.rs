use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, ResetColor, SetAttribute, SetForegroundColor},
};

use crate::component::TableView;
use crate::theme;

use super::shared::{write_line, write_selectable};

/// Column header plus exactly `height` body lines; short tables are padded
/// with blank lines so the status line below stays put.
pub fn render_table(
    out: &mut impl Write,
    table: &TableView,
    width: usize,
    height: usize,
    empty_message: &str,
) -> io::Result<()> {
    let theme = theme::current();
    queue!(out, SetAttribute(Attribute::Bold))?;
    write_line(out, &table.header, width)?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    let mut printed = 0;
    if table.lines.is_empty() && !empty_message.is_empty() {
        queue!(out, SetForegroundColor(theme.muted))?;
        write_line(out, empty_message, width)?;
        queue!(out, ResetColor)?;
        printed += 1;
    }

    for line in table.lines.iter().take(height) {
        if line.header && !line.selected {
            queue!(out, SetForegroundColor(theme.accent), SetAttribute(Attribute::Bold))?;
            write_line(out, &line.text, width)?;
            queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
        } else {
            write_selectable(out, &line.text, width, line.selected)?;
        }
        printed += 1;
    }

    for _ in printed..height {
        write!(out, "\r\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::TableLine;

    #[test]
    fn pads_to_height() {
        let view = TableView {
            header: "NAME".into(),
            lines: vec![TableLine { text: "web".into(), selected: true, header: false }],
        };
        let mut buf = Vec::new();
        render_table(&mut buf, &view, 20, 5, "").unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert_eq!(text.matches("\r\n").count(), 6);
    }
}
