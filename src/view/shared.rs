use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

/// Truncate a string to at most `max_len` characters (not bytes), appending "..."
/// if truncated. Widths too narrow for the ellipsis get a hard cut.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len < 4 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// The longest prefix of `s` holding at most `max_chars` characters.
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Pad or cut `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    let mut line = safe_truncate_chars(text, width).to_string();
    let used = line.chars().count();
    line.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    line
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Human-readable time since `created_ts` (unix seconds).
pub fn format_age(created_ts: i64) -> String {
    if created_ts <= 0 {
        return "unknown".to_string();
    }
    let now = chrono::Utc::now().timestamp();
    let secs = (now - created_ts).max(0) as u64;

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{}h {}m", h, m)
    } else {
        let d = secs / 86400;
        let h = (secs % 86400) / 3600;
        format!("{}d {}h", d, h)
    }
}

pub fn write_line(out: &mut impl Write, text: &str, width: usize) -> io::Result<()> {
    write!(out, "{}\r\n", fit(text, width))
}

pub fn write_selectable(
    out: &mut impl Write,
    text: &str,
    width: usize,
    selected: bool,
) -> io::Result<()> {
    if selected {
        let theme = crate::theme::current();
        queue!(out, SetBackgroundColor(theme.selection_bg), SetForegroundColor(theme.selection_fg))?;
    }
    write!(out, "{}", fit(text, width))?;
    if selected {
        queue!(out, ResetColor)?;
    }
    write!(out, "\r\n")
}

pub fn write_bold(out: &mut impl Write, text: &str, width: usize, color: Color) -> io::Result<()> {
    queue!(out, SetForegroundColor(color), SetAttribute(Attribute::Bold))?;
    write!(out, "{}", fit(text, width))?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    write!(out, "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_str_short_string() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_str_long_string() {
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_str_utf8() {
        assert_eq!(truncate_str("café", 4), "café");
        assert_eq!(truncate_str("hello世界", 6), "hel...");
    }

    #[test]
    fn truncate_str_narrow_width_cuts_hard() {
        assert_eq!(truncate_str("abcdef", 3), "abc");
        assert_eq!(truncate_str("abcdef", 0), "");
    }

    #[test]
    fn safe_truncate_chars_respects_char_boundaries() {
        assert_eq!(safe_truncate_chars("café au lait", 4), "café");
        assert_eq!(safe_truncate_chars("日本語", 2), "日本");
        assert_eq!(safe_truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn fit_pads_and_cuts() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("abcdef", 3), "abc");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2_000), "2.0 kB");
        assert_eq!(format_bytes(1_500_000), "1.5 MB");
    }

    #[test]
    fn format_age_unknown_for_zero() {
        assert_eq!(format_age(0), "unknown");
    }
}
