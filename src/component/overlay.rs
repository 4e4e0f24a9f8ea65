//! Short-lived modal prompts: confirmation, text input and action menu.
//!
//! An overlay knows nothing about what its answer will be used for. It
//! carries an opaque tag and the target it was opened for, and hands both
//! back untouched in its [`OverlayResult`].

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// The resource an overlay was opened for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub name: String,
}

impl Target {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<A> {
    Confirmed,
    Declined,
    Value(String),
    Cancelled,
    Selected(A),
    Dismissed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayResult<T, A> {
    pub tag: T,
    pub target: Target,
    pub outcome: Outcome<A>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuItem<A> {
    pub label: String,
    pub action: A,
}

impl<A> MenuItem<A> {
    pub fn new(label: impl Into<String>, action: A) -> Self {
        Self { label: label.into(), action }
    }
}

/// Single-line editable text.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    value: String,
    /// Cursor position in chars.
    cursor: usize,
}

impl InputField {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_owned(),
            cursor: value.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_at(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map_or(self.value.len(), |(i, _)| i)
    }

    /// Returns true when the key edited or moved within the field.
    pub fn edit(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => {
                self.value.clear();
                self.cursor = 0;
            }
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.value.chars().count(),
            KeyCode::Char(c) if !ctrl => {
                let at = self.byte_at(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                let at = self.byte_at(self.cursor - 1);
                self.value.remove(at);
                self.cursor -= 1;
            }
            KeyCode::Delete if self.cursor < self.value.chars().count() => {
                let at = self.byte_at(self.cursor);
                self.value.remove(at);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }
}

#[derive(Clone, Debug)]
pub struct Menu<A> {
    pub title: String,
    items: Vec<MenuItem<A>>,
    selected: usize,
}

impl<A: Clone> Menu<A> {
    pub fn items(&self) -> &[MenuItem<A>] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn up(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
    }

    fn down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }
}

#[derive(Clone, Debug)]
pub enum OverlayKind<A> {
    Confirm { prompt: String },
    Input { prompt: String, field: InputField },
    Menu(Menu<A>),
}

/// A modal prompt holding exclusive input focus until it produces an outcome.
#[derive(Clone, Debug)]
pub struct Overlay<T, A> {
    tag: T,
    target: Target,
    kind: OverlayKind<A>,
}

impl<T, A: Clone> Overlay<T, A> {
    pub fn confirm(tag: T, target: Target, prompt: impl Into<String>) -> Self {
        Self {
            tag,
            target,
            kind: OverlayKind::Confirm { prompt: prompt.into() },
        }
    }

    pub fn input(tag: T, target: Target, prompt: impl Into<String>, initial: &str) -> Self {
        Self {
            tag,
            target,
            kind: OverlayKind::Input {
                prompt: prompt.into(),
                field: InputField::with_value(initial),
            },
        }
    }

    pub fn menu(tag: T, target: Target, title: impl Into<String>, items: Vec<MenuItem<A>>) -> Self {
        Self {
            tag,
            target,
            kind: OverlayKind::Menu(Menu {
                title: title.into(),
                items,
                selected: 0,
            }),
        }
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn kind(&self) -> &OverlayKind<A> {
        &self.kind
    }

    /// Feed a key. `Some` means the overlay is done and should be popped.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Outcome<A>> {
        match &mut self.kind {
            OverlayKind::Confirm { .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(Outcome::Confirmed),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Enter => {
                    Some(Outcome::Declined)
                }
                _ => None,
            },
            OverlayKind::Input { field, .. } => match key.code {
                KeyCode::Enter => Some(Outcome::Value(field.value().to_owned())),
                KeyCode::Esc => Some(Outcome::Cancelled),
                _ => {
                    field.edit(key);
                    None
                }
            },
            OverlayKind::Menu(menu) => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    menu.up();
                    None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    menu.down();
                    None
                }
                KeyCode::Enter => menu
                    .items
                    .get(menu.selected)
                    .map(|item| Outcome::Selected(item.action.clone())),
                KeyCode::Esc | KeyCode::Char('q') => Some(Outcome::Dismissed),
                _ => None,
            },
        }
    }

    pub fn into_result(self, outcome: Outcome<A>) -> OverlayResult<T, A> {
        OverlayResult {
            tag: self.tag,
            target: self.target,
            outcome,
        }
    }
}
