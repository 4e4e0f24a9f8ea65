//! Process-wide colours, set once at startup and read-only afterwards.

use std::sync::OnceLock;

use crossterm::style::Color;

#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub tab_active_bg: Color,
    pub tab_active_fg: Color,
    pub muted: Color,
    pub title: Color,
    pub accent: Color,
    pub warning: Color,
    pub error: Color,
    pub ok: Color,
    pub match_bg: Color,
    pub current_match_bg: Color,
    pub overlay_bg: Color,
    pub confirm_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            selection_bg: Color::DarkGrey,
            selection_fg: Color::White,
            tab_active_bg: Color::DarkBlue,
            tab_active_fg: Color::White,
            muted: Color::DarkGrey,
            title: Color::White,
            accent: Color::Cyan,
            warning: Color::Yellow,
            error: Color::Red,
            ok: Color::Green,
            match_bg: Color::DarkYellow,
            current_match_bg: Color::Yellow,
            overlay_bg: Color::DarkBlue,
            confirm_bg: Color::DarkRed,
        }
    }
}

impl Theme {
    /// Everything in the terminal's default colours, for `NO_COLOR` users.
    pub fn monochrome() -> Self {
        Self {
            selection_bg: Color::Grey,
            selection_fg: Color::Black,
            tab_active_bg: Color::Grey,
            tab_active_fg: Color::Black,
            muted: Color::Reset,
            title: Color::Reset,
            accent: Color::Reset,
            warning: Color::Reset,
            error: Color::Reset,
            ok: Color::Reset,
            match_bg: Color::Grey,
            current_match_bg: Color::White,
            overlay_bg: Color::Reset,
            confirm_bg: Color::Reset,
        }
    }
}

static THEME: OnceLock<Theme> = OnceLock::new();

/// Install the theme. Only the first call has an effect.
pub fn init(theme: Theme) {
    if THEME.set(theme).is_err() {
        tracing::debug!("theme already initialised");
    }
}

pub fn current() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_falls_back_to_default_and_stays_fixed() {
        let first = current().clone();
        init(Theme::monochrome());
        assert_eq!(current(), &first);
    }
}
