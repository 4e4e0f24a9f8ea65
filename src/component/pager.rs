//! A `less`-style text viewer with search, filter and live follow.
//!
//! Content is kept as lines. The filtered view is always derived from the
//! full content and the filter pattern, and search matches are always derived
//! from the filtered view and the search pattern, so both can be recomputed
//! at any point without losing information.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagerMode {
    Browsing,
    Searching,
    Filtering,
}

/// Where the content comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamState {
    Static,
    Live,
    /// The stream ended or failed; no more reads will be issued.
    Closed(Option<String>),
}

/// A match in filtered line `line`, as a byte range of that line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// What the owner should do after a key.
#[derive(Debug, PartialEq, Eq)]
pub enum PagerEvent {
    None,
    Close,
}

/// One rendered line.
#[derive(Debug, PartialEq)]
pub struct PagerLine {
    pub text: String,
    /// Byte ranges into `text` to highlight.
    pub highlights: Vec<(usize, usize)>,
    pub current: bool,
}

pub struct Pager {
    title: String,
    lines: Vec<String>,
    /// The last line has not been terminated by a newline yet.
    open_line: bool,
    max_lines: usize,
    filter: String,
    filtered: Vec<usize>,
    search: String,
    matches: Vec<Match>,
    current_match: Option<usize>,
    mode: PagerMode,
    input: String,
    follow: bool,
    offset: usize,
    width: usize,
    height: usize,
    stream: StreamState,
}

impl Pager {
    pub fn new(title: impl Into<String>, text: &str, max_lines: usize) -> Self {
        let mut pager = Self {
            title: title.into(),
            lines: Vec::new(),
            open_line: false,
            max_lines: max_lines.max(1),
            filter: String::new(),
            filtered: Vec::new(),
            search: String::new(),
            matches: Vec::new(),
            current_match: None,
            mode: PagerMode::Browsing,
            input: String::new(),
            follow: false,
            offset: 0,
            width: 80,
            height: 1,
            stream: StreamState::Static,
        };
        pager.push_text(text);
        pager.rederive();
        pager
    }

    /// A pager attached to a live stream, following by default.
    pub fn live(title: impl Into<String>, max_lines: usize) -> Self {
        let mut pager = Self::new(title, "", max_lines);
        pager.stream = StreamState::Live;
        pager.follow = true;
        pager
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn mode(&self) -> PagerMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
        if follow {
            self.offset = self.max_offset();
        }
    }

    pub fn stream_state(&self) -> &StreamState {
        &self.stream
    }

    pub fn is_live(&self) -> bool {
        self.stream == StreamState::Live
    }

    /// Terminal state: the stream ended or failed.
    pub fn close_stream(&mut self, error: Option<String>) {
        if self.stream == StreamState::Live {
            self.stream = StreamState::Closed(error);
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn line_count(&self) -> usize {
        self.content_len()
    }

    pub fn visible_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height.max(1);
        if self.follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    /// Append text from a live source. Filter and search are re-applied; the
    /// view only moves when following.
    pub fn append(&mut self, text: &str) {
        self.push_text(text);
        self.rederive();
        if self.follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn set_filter(&mut self, pattern: &str) {
        self.filter = pattern.to_owned();
        self.rederive();
        self.offset = self.offset.min(self.max_offset());
    }

    /// Set the search pattern and jump to the first match.
    pub fn set_search(&mut self, pattern: &str) {
        self.search = pattern.to_owned();
        self.rederive_matches();
        self.current_match = if self.matches.is_empty() { None } else { Some(0) };
        self.jump_to_current_match();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PagerEvent {
        match self.mode {
            PagerMode::Browsing => self.handle_browsing(key),
            PagerMode::Searching | PagerMode::Filtering => {
                self.handle_prompt(key);
                PagerEvent::None
            }
        }
    }

    fn handle_browsing(&mut self, key: KeyEvent) -> PagerEvent {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return PagerEvent::Close,
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::PageUp | KeyCode::Char('b') => self.scroll_up(self.height),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_down(self.height),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_up(self.height / 2)
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_down(self.height / 2)
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.follow = false;
                self.offset = 0;
            }
            KeyCode::End | KeyCode::Char('G') => self.offset = self.max_offset(),
            KeyCode::Char('F') => self.set_follow(!self.follow),
            KeyCode::Char('/') => {
                self.mode = PagerMode::Searching;
                self.input.clear();
            }
            KeyCode::Char('f') => {
                self.mode = PagerMode::Filtering;
                self.input = self.filter.clone();
            }
            KeyCode::Char('n') => self.step_match(true),
            KeyCode::Char('N') => self.step_match(false),
            _ => {}
        }
        PagerEvent::None
    }

    fn handle_prompt(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let pattern = std::mem::take(&mut self.input);
                match self.mode {
                    PagerMode::Searching => self.set_search(&pattern),
                    PagerMode::Filtering => self.set_filter(&pattern),
                    PagerMode::Browsing => {}
                }
                self.mode = PagerMode::Browsing;
            }
            KeyCode::Esc => {
                // A half-typed filter must not linger, so cancelling a filter
                // clears it. Cancelling a search keeps the previous one.
                if self.mode == PagerMode::Filtering {
                    self.set_filter("");
                }
                self.input.clear();
                self.mode = PagerMode::Browsing;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
            }
            _ => {}
        }
    }

    fn scroll_up(&mut self, n: usize) {
        if n > 0 {
            self.follow = false;
        }
        self.offset = self.offset.saturating_sub(n);
    }

    fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    fn step_match(&mut self, forward: bool) {
        if self.matches.is_empty() {
            return;
        }
        let len = self.matches.len();
        let next = match self.current_match {
            None => 0,
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
        };
        self.current_match = Some(next);
        self.jump_to_current_match();
    }

    fn jump_to_current_match(&mut self) {
        if let Some(m) = self.current_match.and_then(|i| self.matches.get(i)) {
            self.follow = false;
            self.offset = m.line.min(self.max_offset());
        }
    }

    fn max_offset(&self) -> usize {
        self.filtered.len().saturating_sub(self.height)
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let touched = self.lines.len().saturating_sub(1);
        let mut pieces = text.split('\n');
        if let Some(first) = pieces.next() {
            match self.lines.last_mut() {
                Some(last) if self.open_line => last.push_str(first),
                _ => self.lines.push(first.to_owned()),
            }
        }
        for piece in pieces {
            self.lines.push(piece.to_owned());
        }
        // `split` yields a trailing "" after a final newline; that empty line
        // is the open line the next chunk continues.
        self.open_line = true;
        for line in &mut self.lines[touched..] {
            if line.ends_with('\r') {
                line.pop();
            }
        }
        let len = self.content_len();
        if len > self.max_lines {
            self.lines.drain(..len - self.max_lines);
        }
    }

    /// Lines for display, without the trailing empty open line.
    fn content_len(&self) -> usize {
        match self.lines.last() {
            Some(last) if self.open_line && last.is_empty() => self.lines.len() - 1,
            _ => self.lines.len(),
        }
    }

    fn rederive(&mut self) {
        let len = self.content_len();
        if self.filter.is_empty() {
            self.filtered = (0..len).collect();
        } else {
            let needle = self.filter.to_lowercase();
            self.filtered = (0..len)
                .filter(|&i| self.lines[i].to_lowercase().contains(&needle))
                .collect();
        }
        let previous = self.current_match.and_then(|i| self.matches.get(i)).copied();
        self.rederive_matches();
        self.current_match = previous
            .and_then(|p| self.matches.iter().position(|m| *m == p))
            .or(if self.matches.is_empty() { None } else { Some(0) });
    }

    fn rederive_matches(&mut self) {
        self.matches.clear();
        if self.search.is_empty() {
            return;
        }
        let needle = self.search.to_lowercase();
        for (pos, &line_idx) in self.filtered.iter().enumerate() {
            for (start, end) in find_matches(&self.lines[line_idx], &needle) {
                self.matches.push(Match { line: pos, start, end });
            }
        }
    }

    pub fn view(&self) -> Vec<PagerLine> {
        let current = self.current_match.and_then(|i| self.matches.get(i));
        let end = (self.offset + self.height).min(self.filtered.len());
        (self.offset..end)
            .map(|pos| {
                let line = &self.lines[self.filtered[pos]];
                let text = crate::view::safe_truncate_chars(line, self.width).to_owned();
                let highlights = self
                    .matches
                    .iter()
                    .filter(|m| m.line == pos && m.start < text.len())
                    .map(|m| (m.start, m.end.min(text.len())))
                    .collect();
                PagerLine {
                    text,
                    highlights,
                    current: current.is_some_and(|m| m.line == pos),
                }
            })
            .collect()
    }
}

/// Case-insensitive literal matches of `needle_lower` in `line`, as byte
/// ranges of the original line.
fn find_matches(line: &str, needle_lower: &str) -> Vec<(usize, usize)> {
    if needle_lower.is_empty() {
        return Vec::new();
    }
    let mut folded = String::with_capacity(line.len());
    let mut origin = Vec::with_capacity(line.len() + 1);
    for (idx, ch) in line.char_indices() {
        for lower in ch.to_lowercase() {
            let before = folded.len();
            folded.push(lower);
            origin.extend(std::iter::repeat_n(idx, folded.len() - before));
        }
    }
    origin.push(line.len());

    folded
        .match_indices(needle_lower)
        .map(|(start, m)| {
            let begin = origin[start];
            let mut end = origin[start + m.len()];
            if end <= begin {
                // The needle ended inside the lowercase expansion of one char.
                end = line[begin..]
                    .chars()
                    .next()
                    .map_or(line.len(), |c| begin + c.len_utf8());
            }
            (begin, end)
        })
        .collect()
}
