use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::component::{Overlay, Pager, PagerEvent, Target};
use crate::model::ViewMode;

use super::views::{self, action_for_key, menu_items, needs_target};
use super::{App, Cmd, Followup, Layer, PagerKind};

impl App {
    /// Route one key press. An open layer takes every key; otherwise global
    /// bindings win over the active view's.
    pub(super) fn handle_key(&mut self, key: KeyEvent) -> Vec<Cmd> {
        if let Some(layer) = self.layer.take() {
            return self.handle_layer_key(layer, key);
        }

        // Any action dismisses the previous status message.
        self.status = None;

        if let Some(cmds) = self.handle_global_key(key) {
            return cmds;
        }
        self.handle_view_key(key)
    }

    fn handle_layer_key(&mut self, layer: Layer, key: KeyEvent) -> Vec<Cmd> {
        match layer {
            Layer::Prompt(mut overlay) => match overlay.handle_key(key) {
                // The slot is already empty; the result applies to the view
                // and target the prompt was opened on.
                Some(outcome) => self.on_overlay_result(overlay.into_result(outcome)),
                None => {
                    self.layer = Some(Layer::Prompt(overlay));
                    Vec::new()
                }
            },
            Layer::Pager(mut pager) => {
                if pager.pager.handle_key(key) == PagerEvent::Close {
                    self.layer = Some(Layer::Pager(pager));
                    self.close_layer();
                } else {
                    self.layer = Some(Layer::Pager(pager));
                }
                Vec::new()
            }
        }
    }

    fn handle_global_key(&mut self, key: KeyEvent) -> Option<Vec<Cmd>> {
        let KeyEvent { code, modifiers, .. } = key;
        if modifiers.contains(KeyModifiers::CONTROL) {
            if code == KeyCode::Char('c') {
                self.quit = true;
                return Some(Vec::new());
            }
            return None;
        }

        let cmds = match code {
            KeyCode::Char('q') => {
                self.quit = true;
                Vec::new()
            }
            KeyCode::Char('?') => {
                let help = Pager::new("Help", views::HELP, self.config.log_buffer);
                self.open_pager(PagerKind::Text, help, None);
                Vec::new()
            }
            KeyCode::Char(c @ '1'..='7') => {
                let index = (c as usize) - ('1' as usize);
                self.switch_view(ViewMode::NUMBERED[index])
            }
            KeyCode::Char('m') => {
                if self.view == ViewMode::Monitor {
                    self.switch_view(ViewMode::Containers)
                } else {
                    self.switch_view(ViewMode::Monitor)
                }
            }
            KeyCode::Char('H') => {
                self.show_header = !self.show_header;
                self.resize_all();
                Vec::new()
            }
            KeyCode::F(8) => self.switch_view(ViewMode::DiskUsage),
            KeyCode::F(9) => {
                let mut pager = Pager::live("Events", super::EVENT_HISTORY);
                for event in &self.events {
                    pager.append(&format!("{}\n", event.describe()));
                }
                self.open_pager(PagerKind::Events, pager, None);
                Vec::new()
            }
            KeyCode::F(10) => vec![Cmd::Info],
            _ => return None,
        };
        Some(cmds)
    }

    fn handle_view_key(&mut self, key: KeyEvent) -> Vec<Cmd> {
        let view = self.view;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if !ctrl {
            let Some(table) = self.table_mut() else {
                return Vec::new();
            };
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => table.cursor_up(1),
                KeyCode::Down | KeyCode::Char('j') => table.cursor_down(1),
                KeyCode::PageUp => table.page_up(),
                KeyCode::PageDown => table.page_down(),
                KeyCode::Home | KeyCode::Char('g') => table.home(),
                KeyCode::End | KeyCode::Char('G') => table.end(),
                KeyCode::F(1) => {
                    table.next_sort();
                    table.sort_by_active_column();
                    self.sorted.insert(view);
                }
                KeyCode::F(2) if view == ViewMode::Containers => {
                    self.show_all = !self.show_all;
                    return self.request_load(view);
                }
                KeyCode::F(5) => return self.request_load(view),
                KeyCode::Char('%') => {
                    let current = table.filter().to_string();
                    self.layer = Some(Layer::Prompt(Overlay::input(
                        Followup::Filter,
                        Target::new("", view.title()),
                        "Filter:",
                        &current,
                    )));
                }
                KeyCode::Esc | KeyCode::Backspace => return self.back(),
                KeyCode::Enter => {
                    if let Some(items) = menu_items(view) {
                        if let Some((target, _)) = self.selected_target() {
                            let title = target.name.clone();
                            self.layer = Some(Layer::Prompt(Overlay::menu(
                                Followup::Menu,
                                target,
                                title,
                                items,
                            )));
                        }
                        return Vec::new();
                    }
                    return self.key_action(key);
                }
                _ => return self.key_action(key),
            }
            return Vec::new();
        }
        self.key_action(key)
    }

    fn key_action(&mut self, key: KeyEvent) -> Vec<Cmd> {
        let Some(action) = action_for_key(self.view, key) else {
            return Vec::new();
        };
        if !needs_target(action) {
            return self.run_action(action, Target::new("", ""), None);
        }
        match self.selected_target() {
            Some((target, row)) => self.run_action(action, target, Some(row)),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Msg;
    use crate::component::{OverlayKind, TableRow};
    use crate::config::Config;
    use crate::model::{ContainerInfo, Row};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app_with_containers(n: usize) -> App {
        let mut app = App::new(Config::default());
        app.update(Msg::Resize(120, 40));
        app.init();
        let rows = (0..n)
            .map(|i| {
                Row::Container(ContainerInfo {
                    id: format!("c{i}"),
                    name: format!("web-{i}"),
                    state: "running".into(),
                    ..Default::default()
                })
            })
            .collect();
        app.update(Msg::Loaded {
            view: ViewMode::Containers,
            scope: None,
            rows,
        });
        app
    }

    #[test]
    fn prompt_swallows_global_keys() {
        let mut app = app_with_containers(3);
        app.handle_key(key(KeyCode::Char('%')));
        assert!(app.overlay().is_some());

        let cmds = app.handle_key(key(KeyCode::Char('q')));
        assert!(cmds.is_empty());
        assert!(!app.should_quit());
        app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.view(), ViewMode::Containers);
        match app.overlay().map(|o| o.kind()) {
            Some(OverlayKind::Input { field, .. }) => assert_eq!(field.value(), "q2"),
            _ => panic!("input overlay expected"),
        }
    }

    #[test]
    fn filter_result_lands_on_the_view_it_was_typed_in() {
        let mut app = app_with_containers(3);
        app.handle_key(key(KeyCode::Char('%')));
        for c in "web-1".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
        assert!(app.overlay().is_none());
        assert_eq!(app.active_table().map(|t| t.filter()), Some("web-1"));

        // A key right behind Enter acts on the filtered view.
        app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.view(), ViewMode::Images);
        assert_eq!(app.table(ViewMode::Containers).map(|t| t.filter()), Some("web-1"));
        assert_eq!(app.table(ViewMode::Containers).map(|t| t.row_count()), Some(1));
        assert_eq!(app.table(ViewMode::Images).map(|t| t.filter()), Some(""));
    }

    #[test]
    fn menu_choice_runs_against_the_row_it_was_opened_on() {
        let mut app = app_with_containers(2);
        app.handle_key(key(KeyCode::Enter));
        // Logs, then Inspect.
        app.handle_key(key(KeyCode::Down));
        let cmds = app.handle_key(key(KeyCode::Enter));
        assert!(app.overlay().is_none());
        match cmds.as_slice() {
            [Cmd::Inspect { kind, id, .. }] => {
                assert_eq!(*kind, crate::model::InspectKind::Container);
                assert_eq!(id, "c0");
            }
            _ => panic!("inspect expected"),
        }

        // Moving on afterwards does not replay the choice elsewhere.
        assert!(app.handle_key(key(KeyCode::Char('2'))).iter().all(|c| !matches!(c, Cmd::Inspect { .. })));
    }

    #[test]
    fn navigation_reaches_the_table() {
        let mut app = app_with_containers(3);
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Down));
        let selected = app.active_table().and_then(|t| t.selected()).and_then(|r| r.id());
        assert_eq!(selected, Some("c2"));
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.active_table().and_then(|t| t.cursor()), Some(0));
    }

    #[test]
    fn number_keys_switch_views_and_load() {
        let mut app = app_with_containers(1);
        let cmds = app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.view(), ViewMode::Images);
        assert!(matches!(cmds.as_slice(), [Cmd::Load { view: ViewMode::Images, .. }]));
    }

    #[test]
    fn destructive_key_opens_confirmation_only() {
        let mut app = app_with_containers(2);
        let cmds = app.handle_key(ctrl('k'));
        assert!(cmds.is_empty());
        match app.overlay() {
            Some(o) => {
                assert!(matches!(o.kind(), OverlayKind::Confirm { .. }));
                assert_eq!(o.target().id, "c0");
            }
            None => panic!("confirmation expected"),
        }
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = app_with_containers(0);
        app.handle_key(ctrl('c'));
        assert!(app.should_quit());
    }

    #[test]
    fn header_rows_take_no_actions() {
        let mut app = App::new(Config::default());
        app.update(Msg::Resize(120, 40));
        app.handle_key(KeyEvent::new(KeyCode::F(8), KeyModifiers::NONE));
        app.update(Msg::Loaded {
            view: ViewMode::DiskUsage,
            scope: None,
            rows: vec![Row::Section("Summary".into())],
        });
        assert!(app.active_table().and_then(|t| t.selected()).and_then(|r| r.id()).is_none());
        assert!(app.handle_key(key(KeyCode::Char('i'))).is_empty());
        assert!(app.overlay().is_none());
        // Prune works on the whole view.
        app.handle_key(ctrl('p'));
        assert!(app.overlay().is_some());
    }
}
