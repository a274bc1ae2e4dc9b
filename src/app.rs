use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::{ListState, TableState};

use crate::models::{PodRow, UiEvent, WatchEvent};

const MAX_LOG_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Pods,
    Logs,
}

/// What the event loop has to do on behalf of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListNamespaces,
    SwitchNamespace(String),
}

pub struct NamespacePicker {
    pub items: Vec<String>,
    pub state: ListState,
}

pub struct App {
    pub namespace: String,
    pub pods: Vec<PodRow>,
    pub logs: VecDeque<String>,
    pub page: Page,
    pub picker: Option<NamespacePicker>,
    pub table: TableState,
    pub should_quit: bool,
}

impl App {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pods: Vec::new(),
            logs: VecDeque::new(),
            page: Page::Pods,
            picker: None,
            table: TableState::default(),
            should_quit: false,
        }
    }

    pub fn log(&mut self, line: impl Into<String>) {
        if self.logs.len() == MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back(line.into());
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Pods { namespace, mut rows } => {
                if namespace != self.namespace {
                    return;
                }
                rows.sort_by(|a, b| a.name.cmp(&b.name));
                self.pods = rows;
                self.table.select(if self.pods.is_empty() { None } else { Some(0) });
            }
            UiEvent::Watch { namespace, event } => {
                if namespace == self.namespace {
                    self.apply_watch(event);
                }
            }
            UiEvent::Log(line) => self.log(line),
            UiEvent::Namespaces(items) => {
                if let Some(picker) = self.picker.as_mut() {
                    let current = items.iter().position(|n| *n == self.namespace).unwrap_or(0);
                    picker.state.select(if items.is_empty() { None } else { Some(current) });
                    picker.items = items;
                }
            }
        }
    }

    fn apply_watch(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Added(row) | WatchEvent::Modified(row) => {
                match self.pods.binary_search_by(|p| p.name.cmp(&row.name)) {
                    Ok(i) => self.pods[i] = row,
                    Err(i) => self.pods.insert(i, row),
                }
            }
            WatchEvent::Deleted(name) => {
                if let Ok(i) = self.pods.binary_search_by(|p| p.name.cmp(&name)) {
                    self.pods.remove(i);
                }
                if self.table.selected().is_some_and(|s| s >= self.pods.len()) {
                    self.table.select(self.pods.len().checked_sub(1));
                }
            }
            WatchEvent::Error(message) => self.log(format!("Watch error: {message}")),
            WatchEvent::Bookmark => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return None;
        }

        if let Some(picker) = self.picker.as_mut() {
            match key.code {
                KeyCode::Esc => self.picker = None,
                KeyCode::Up | KeyCode::Char('k') => picker.state.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => picker.state.select_next(),
                KeyCode::Enter => {
                    let chosen = picker
                        .state
                        .selected()
                        .and_then(|i| picker.items.get(i.min(picker.items.len().saturating_sub(1))))
                        .cloned();
                    self.picker = None;
                    if let Some(namespace) = chosen {
                        self.log(format!("Switching to namespace {namespace}"));
                        self.namespace = namespace.clone();
                        self.pods.clear();
                        self.table.select(None);
                        return Some(Action::SwitchNamespace(namespace));
                    }
                }
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('n') => {
                self.picker = Some(NamespacePicker {
                    items: Vec::new(),
                    state: ListState::default(),
                });
                return Some(Action::ListNamespaces);
            }
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
                self.page = match self.page {
                    Page::Pods => Page::Logs,
                    Page::Logs => Page::Pods,
                };
            }
            KeyCode::Up | KeyCode::Char('k') => self.table.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.table.select_next(),
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn row(name: &str, phase: &str) -> PodRow {
        PodRow { name: name.into(), phase: phase.into(), started_at: None }
    }

    #[test]
    fn snapshot_then_watch_events_update_the_table() {
        let mut app = App::new("default");
        app.apply(UiEvent::Pods { namespace: "default".into(), rows: vec![row("b", "Running"), row("a", "Pending")] });
        assert_eq!(app.pods.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["a", "b"]);

        app.apply(UiEvent::Watch { namespace: "default".into(), event: WatchEvent::Modified(row("a", "Running")) });
        app.apply(UiEvent::Watch { namespace: "default".into(), event: WatchEvent::Added(row("c", "Pending")) });
        app.apply(UiEvent::Watch { namespace: "default".into(), event: WatchEvent::Deleted("b".into()) });

        assert_eq!(app.pods, vec![row("a", "Running"), row("c", "Pending")]);
    }

    #[test]
    fn events_for_other_namespaces_are_ignored() {
        let mut app = App::new("default");
        app.apply(UiEvent::Pods { namespace: "old".into(), rows: vec![row("x", "Running")] });
        app.apply(UiEvent::Watch { namespace: "old".into(), event: WatchEvent::Added(row("y", "Running")) });
        assert!(app.pods.is_empty());
    }

    #[test]
    fn log_is_bounded_and_ordered() {
        let mut app = App::new("default");
        for i in 0..MAX_LOG_LINES + 5 {
            app.apply(UiEvent::Log(format!("line {i}")));
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs.front().unwrap(), "line 5");
    }

    #[test]
    fn picking_a_namespace_requests_a_switch() {
        let mut app = App::new("default");
        assert_eq!(app.handle_key(key(KeyCode::Char('n'))), Some(Action::ListNamespaces));

        app.apply(UiEvent::Namespaces(vec!["default".into(), "kube-system".into()]));
        assert_eq!(app.picker.as_ref().unwrap().state.selected(), Some(0));

        assert_eq!(app.handle_key(key(KeyCode::Down)), None);
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::SwitchNamespace("kube-system".into()))
        );
        assert!(app.picker.is_none());
        assert_eq!(app.namespace, "kube-system");
        assert_eq!(app.logs.back().unwrap(), "Switching to namespace kube-system");
    }

    #[test]
    fn escape_closes_picker_without_switching() {
        let mut app = App::new("default");
        app.handle_key(key(KeyCode::Char('n')));
        app.apply(UiEvent::Namespaces(vec!["other".into()]));
        assert_eq!(app.handle_key(key(KeyCode::Esc)), None);
        assert!(app.picker.is_none());
        assert_eq!(app.namespace, "default");
    }

    #[test]
    fn paging_and_quitting() {
        let mut app = App::new("default");
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.page, Page::Logs);
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.page, Page::Pods);

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
