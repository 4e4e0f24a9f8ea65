use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::component::{Overlay, OverlayKind};
use crate::theme;

use super::shared::fit;

/// Prompts are drawn as a bar above the status line; menus as a centred box.
pub fn render_overlay<T, A: Clone>(
    out: &mut impl Write,
    overlay: &Overlay<T, A>,
    width: usize,
    height: usize,
) -> io::Result<()> {
    let theme = theme::current();
    let bar_y = height.saturating_sub(3) as u16;

    match overlay.kind() {
        OverlayKind::Confirm { prompt } => {
            queue!(out, MoveTo(0, bar_y))?;
            queue!(
                out,
                SetBackgroundColor(theme.confirm_bg),
                SetForegroundColor(Color::White),
                SetAttribute(Attribute::Bold)
            )?;
            write!(out, "{}", fit(&format!("  {}", prompt), width))?;
            queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
        }
        OverlayKind::Input { prompt, field } => {
            let value = field.value();
            let split = value
                .char_indices()
                .nth(field.cursor())
                .map_or(value.len(), |(i, _)| i);
            let line = format!("  {} {}|{}", prompt, &value[..split], &value[split..]);
            queue!(out, MoveTo(0, bar_y))?;
            queue!(out, SetBackgroundColor(theme.overlay_bg), SetForegroundColor(Color::White))?;
            write!(out, "{}", fit(&line, width))?;
            queue!(out, ResetColor)?;
        }
        OverlayKind::Menu(menu) => {
            let inner = menu
                .items()
                .iter()
                .map(|i| i.label.chars().count() + 4)
                .chain(std::iter::once(menu.title.chars().count() + 4))
                .max()
                .unwrap_or(10)
                .min(width.saturating_sub(4));
            let rows = menu.items().len() + 2;
            let x = (width.saturating_sub(inner + 2) / 2) as u16;
            let y = (height.saturating_sub(rows) / 2) as u16;

            queue!(out, MoveTo(x, y), SetBackgroundColor(theme.overlay_bg), SetForegroundColor(Color::White))?;
            queue!(out, SetAttribute(Attribute::Bold))?;
            write!(out, " {} ", fit(&menu.title, inner))?;
            queue!(out, SetAttribute(Attribute::Reset))?;
            for (idx, item) in menu.items().iter().enumerate() {
                queue!(out, MoveTo(x, y + 1 + idx as u16))?;
                if idx == menu.selected() {
                    queue!(out, SetBackgroundColor(theme.selection_bg), SetForegroundColor(theme.selection_fg))?;
                    write!(out, " {} ", fit(&format!("> {}", item.label), inner))?;
                    queue!(out, SetBackgroundColor(theme.overlay_bg), SetForegroundColor(Color::White))?;
                } else {
                    write!(out, " {} ", fit(&format!("  {}", item.label), inner))?;
                }
            }
            queue!(out, MoveTo(x, y + 1 + menu.items().len() as u16), SetForegroundColor(theme.muted))?;
            write!(out, " {} ", fit("Enter: select  Esc: close", inner))?;
            queue!(out, ResetColor)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{MenuItem, Target};

    #[test]
    fn menu_marks_selected_item() {
        let overlay: Overlay<(), u8> = Overlay::menu(
            (),
            Target::new("abc", "web"),
            "web",
            vec![MenuItem::new("Logs", 1), MenuItem::new("Kill", 2)],
        );
        let mut buf = Vec::new();
        render_overlay(&mut buf, &overlay, 80, 24).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("> Logs"));
        assert!(text.contains("  Kill"));
    }

    #[test]
    fn input_shows_cursor_position() {
        let overlay: Overlay<(), u8> = Overlay::input((), Target::default(), "Replicas:", "3");
        let mut buf = Vec::new();
        render_overlay(&mut buf, &overlay, 80, 24).unwrap();
        assert!(String::from_utf8_lossy(&buf).contains("Replicas: 3|"));
    }
}
