use std::path::PathBuf;

use ratatui::widgets::TableState;

use crate::commands::{about_text, cmd_share_with};
use crate::controller::{Clock, Controller, SystemClock};
use crate::models::{Task, TaskStatus};
use crate::sections::{group_by_section, SectionField, TimeSection};
use crate::share::default_targets;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Adding,
    Settings,
    About,
}

/// Rows of the settings popup, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    TimeLimit,
    ShowRemaining,
    ShowCompleted,
    ShowExpired,
}

impl SettingsRow {
    pub const ALL: [SettingsRow; 4] = [
        SettingsRow::TimeLimit,
        SettingsRow::ShowRemaining,
        SettingsRow::ShowCompleted,
        SettingsRow::ShowExpired,
    ];
}

pub enum DisplayItem {
    Task(Task),
    SectionHeader(TimeSection, usize), // Section, count
}

pub struct App<S: KeyValueStore, C: Clock = SystemClock> {
    pub ctl: Controller<S, C>,
    pub tab: TaskStatus,
    pub display_items: Vec<DisplayItem>,
    pub state: TableState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub settings_row: usize,
    pub status_message: Option<String>,
    pub data_dir: PathBuf,
}

impl<S: KeyValueStore, C: Clock> App<S, C> {
    /// Creates a new App on top of a loaded controller.
    pub fn new(ctl: Controller<S, C>, data_dir: PathBuf) -> App<S, C> {
        let mut app = App {
            ctl,
            tab: TaskStatus::Active,
            display_items: Vec::new(),
            state: TableState::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            settings_row: 0,
            status_message: None,
            data_dir,
        };
        app.reload();
        app
    }

    /// Selects the next row, skipping section headers.
    pub fn next(&mut self) {
        self.step(true);
    }

    /// Selects the previous row, skipping section headers.
    pub fn previous(&mut self) {
        self.step(false);
    }

    fn step(&mut self, forward: bool) {
        let len = self.display_items.len();
        if len == 0 {
            return;
        }
        let mut i = self.state.selected().unwrap_or(0);
        for _ in 0..len {
            i = if forward { (i + 1) % len } else { (i + len - 1) % len };
            if matches!(self.display_items[i], DisplayItem::Task(_)) {
                self.state.select(Some(i));
                return;
            }
        }
    }

    /// The task under the cursor, if any.
    pub fn selected_task(&self) -> Option<&Task> {
        match self.state.selected().and_then(|i| self.display_items.get(i)) {
            Some(DisplayItem::Task(t)) => Some(t),
            _ => None,
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.selected_task().map(|t| t.id.clone())
    }

    /// Id of the selected task if it is still active right now. Rows can
    /// lag the clock by up to one tick.
    fn selected_active_id(&self) -> Option<String> {
        let now = self.ctl.now();
        self.selected_task()
            .and_then(|t| self.ctl.tasks().get(&t.id))
            .filter(|t| t.status(now) == TaskStatus::Active)
            .map(|t| t.id.clone())
    }

    fn select_task(&mut self, id: &str) {
        let row = self
            .display_items
            .iter()
            .position(|d| matches!(d, DisplayItem::Task(t) if t.id == id));
        if row.is_some() {
            self.state.select(row);
        }
    }

    /// Rebuilds the rows of the current tab from the controller.
    pub fn reload(&mut self) {
        let now = self.ctl.now();
        let partition = self.ctl.partition();
        let tasks = partition.get(self.tab);

        self.display_items.clear();
        match SectionField::for_status(self.tab) {
            None => {
                for t in tasks {
                    self.display_items.push(DisplayItem::Task((*t).clone()));
                }
            }
            Some(field) => {
                for (section, items) in group_by_section(tasks.iter().copied(), field, now) {
                    if items.is_empty() {
                        continue;
                    }
                    self.display_items.push(DisplayItem::SectionHeader(section, items.len()));
                    for t in items {
                        self.display_items.push(DisplayItem::Task(t.clone()));
                    }
                }
            }
        }

        let first_task = self
            .display_items
            .iter()
            .position(|d| matches!(d, DisplayItem::Task(_)));
        match (self.state.selected(), first_task) {
            (_, None) => self.state.select(None),
            (Some(i), Some(_)) if i < self.display_items.len() => {
                if matches!(self.display_items[i], DisplayItem::SectionHeader(..)) {
                    self.state.select(Some(i));
                    self.next();
                }
            }
            (Some(_), Some(_)) => {
                self.state.select(Some(self.display_items.len() - 1));
                if matches!(self.display_items.last(), Some(DisplayItem::SectionHeader(..))) {
                    self.previous();
                }
            }
            (None, Some(first)) => self.state.select(Some(first)),
        }
    }

    /// Runs the periodic sweep and rebuilds the rows, so tasks that expired
    /// or came back since the last tick move to their new tab.
    pub fn tick(&mut self) {
        self.ctl.tick();
        self.reload();
    }

    pub fn set_tab(&mut self, tab: TaskStatus) {
        if self.tab != tab {
            self.tab = tab;
            self.state.select(None);
            self.reload();
        }
    }

    pub fn next_tab(&mut self) {
        let i = TaskStatus::ALL.iter().position(|t| *t == self.tab).unwrap_or(0);
        self.set_tab(TaskStatus::ALL[(i + 1) % TaskStatus::ALL.len()]);
    }

    pub fn previous_tab(&mut self) {
        let i = TaskStatus::ALL.iter().position(|t| *t == self.tab).unwrap_or(0);
        let len = TaskStatus::ALL.len();
        self.set_tab(TaskStatus::ALL[(i + len - 1) % len]);
    }

    /// Marks the selected active task as complete.
    pub fn complete_selected(&mut self) {
        if self.tab != TaskStatus::Active { return; }
        if let Some(id) = self.selected_active_id() {
            self.ctl.complete(&id);
        }
        self.reload();
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.ctl.delete(&id);
            self.reload();
        }
    }

    /// Restarts the timer on the active tab, restores the task elsewhere.
    pub fn reset_or_restore_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            match self.tab {
                TaskStatus::Active => {
                    if self.selected_active_id().is_none() {
                        self.reload();
                        return;
                    }
                    self.ctl.reset(&id);
                    self.status_message = Some(format!("Timer reset to {}h", self.ctl.settings().default_time_limit));
                }
                TaskStatus::Completed | TaskStatus::Expired => {
                    self.ctl.readd(&id);
                    self.status_message = Some("Task restored to active".to_string());
                }
            }
            self.reload();
        }
    }

    pub fn toggle_recurring_selected(&mut self) {
        if self.tab != TaskStatus::Active { return; }
        if let Some(id) = self.selected_active_id() {
            self.ctl.toggle_recurring(&id);
        }
        self.reload();
    }

    /// Moves the selected active task one row up or down.
    pub fn move_selected(&mut self, down: bool) {
        if self.tab != TaskStatus::Active { return; }
        let Some(id) = self.selected_active_id() else {
            self.reload();
            return;
        };
        // Positions come from the live active list, not the rows on screen.
        let now = self.ctl.now();
        let source = self.ctl.tasks().active(now).iter().position(|t| t.id == id);
        let target = source.and_then(|i| if down { Some(i + 1) } else { i.checked_sub(1) });
        if let (Some(source), Some(target)) = (source, target) {
            self.ctl.move_active(source, target);
        }
        self.reload();
        self.select_task(&id);
    }

    /// Starts typing a new task. Tasks are only added from the Active tab.
    pub fn start_add(&mut self) {
        if self.tab != TaskStatus::Active { return; }
        self.input_mode = InputMode::Adding;
        self.input_buffer.clear();
    }

    /// Handles Enter while typing a new task.
    pub fn handle_input(&mut self) {
        if self.input_mode == InputMode::Adding {
            if self.ctl.add(&self.input_buffer).is_some() {
                self.reload();
                let last = self.display_items.len().saturating_sub(1);
                self.state.select(Some(last));
            }
            self.input_buffer.clear();
            self.input_mode = InputMode::Normal;
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    pub fn open_settings(&mut self) {
        self.input_mode = InputMode::Settings;
        self.settings_row = 0;
    }

    pub fn settings_next(&mut self) {
        self.settings_row = (self.settings_row + 1) % SettingsRow::ALL.len();
    }

    pub fn settings_previous(&mut self) {
        let len = SettingsRow::ALL.len();
        self.settings_row = (self.settings_row + len - 1) % len;
    }

    pub fn current_settings_row(&self) -> SettingsRow {
        SettingsRow::ALL[self.settings_row % SettingsRow::ALL.len()]
    }

    /// Changes the time limit by `delta` hours; clamped by the controller.
    pub fn adjust_time_limit(&mut self, delta: i64) {
        if self.current_settings_row() == SettingsRow::TimeLimit {
            let hours = self.ctl.settings().default_time_limit + delta;
            self.ctl.set_time_limit(hours);
            self.reload();
        }
    }

    /// Flips the toggle under the cursor.
    pub fn toggle_setting(&mut self) {
        let s = self.ctl.settings().clone();
        match self.current_settings_row() {
            SettingsRow::TimeLimit => {}
            SettingsRow::ShowRemaining => self.ctl.set_show_time_remaining(!s.show_time_remaining),
            SettingsRow::ShowCompleted => self.ctl.set_show_time_completed(!s.show_time_completed),
            SettingsRow::ShowExpired => self.ctl.set_show_time_expired(!s.show_time_expired),
        }
    }

    pub fn open_about(&mut self) {
        self.input_mode = InputMode::About;
    }

    pub fn about(&self) -> String {
        about_text(&self.data_dir)
    }

    /// Shares the active tasks and reports the outcome in the status bar.
    pub fn share(&mut self) {
        self.status_message = Some(match cmd_share_with(&self.ctl, &default_targets()) {
            Ok(msg) | Err(msg) => msg,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::cell::Cell;

    struct TestClock(Cell<DateTime<Utc>>);

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    fn clock() -> TestClock {
        TestClock(Cell::new(Utc.with_ymd_and_hms(2025, 5, 5, 10, 0, 0).unwrap()))
    }

    fn titles<S: KeyValueStore, C: Clock>(app: &App<S, C>) -> Vec<String> {
        app.display_items
            .iter()
            .map(|d| match d {
                DisplayItem::Task(t) => t.title.clone(),
                DisplayItem::SectionHeader(s, n) => format!("[{} {}]", s, n),
            })
            .collect()
    }

    #[test]
    fn add_complete_and_switch_tabs() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut app = App::new(Controller::with_clock(&store, &clock), PathBuf::from("."));
        app.start_add();
        app.input_buffer = "  write tests ".into();
        app.handle_input();
        assert_eq!(titles(&app), vec!["write tests"]);
        assert_eq!(app.input_mode, InputMode::Normal);

        app.complete_selected();
        assert!(app.display_items.is_empty());
        assert_eq!(app.state.selected(), None);

        app.set_tab(TaskStatus::Completed);
        assert_eq!(titles(&app), vec!["[Today 1]", "write tests"]);
        assert_eq!(app.state.selected(), Some(1));

        app.reset_or_restore_selected();
        assert!(app.display_items.is_empty());
        app.previous_tab();
        assert_eq!(app.tab, TaskStatus::Active);
        assert_eq!(titles(&app), vec!["write tests"]);
    }

    #[test]
    fn blank_add_is_ignored() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut app = App::new(Controller::with_clock(&store, &clock), PathBuf::from("."));
        app.start_add();
        app.input_buffer = "   ".into();
        app.handle_input();
        assert!(app.display_items.is_empty());
    }

    #[test]
    fn move_selected_swaps_rows() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut ctl = Controller::with_clock(&store, &clock);
        ctl.add("a");
        ctl.add("b");
        let mut app = App::new(ctl, PathBuf::from("."));
        assert_eq!(app.state.selected(), Some(0));
        app.move_selected(true);
        assert_eq!(titles(&app), vec!["b", "a"]);
        assert_eq!(app.state.selected(), Some(1));
        app.move_selected(true);
        assert_eq!(titles(&app), vec!["b", "a"]);
    }

    #[test]
    fn settings_popup_clamps_and_toggles() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut app = App::new(Controller::with_clock(&store, &clock), PathBuf::from("."));
        app.open_settings();
        app.adjust_time_limit(500);
        assert_eq!(app.ctl.settings().default_time_limit, 168);
        app.settings_next();
        app.toggle_setting();
        assert!(!app.ctl.settings().show_time_remaining);
        app.settings_previous();
        assert_eq!(app.current_settings_row(), SettingsRow::TimeLimit);
    }

    #[test]
    fn tick_brings_back_recurring_task() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut ctl = Controller::with_clock(&store, &clock);
        let id = ctl.add("stretch").unwrap();
        ctl.toggle_recurring(&id);
        ctl.complete(&id);
        let mut app = App::new(ctl, PathBuf::from("."));
        assert!(app.display_items.is_empty());
        clock.0.set(clock.0.get() + Duration::hours(25));
        app.tick();
        assert_eq!(titles(&app), vec!["stretch"]);
    }

    #[test]
    fn tick_drops_expired_rows_and_actions_follow_the_live_list() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut ctl = Controller::with_clock(&store, &clock);
        ctl.set_time_limit(1);
        let short = ctl.add("short").unwrap();
        ctl.set_time_limit(24);
        ctl.add("b");
        ctl.add("c");
        let mut app = App::new(ctl, PathBuf::from("."));
        clock.0.set(clock.0.get() + Duration::hours(2));

        // Rows are stale until the next tick; acting on an expired row is refused.
        assert_eq!(titles(&app), vec!["short", "b", "c"]);
        app.state.select(Some(0));
        app.complete_selected();
        assert!(!app.ctl.tasks().get(&short).unwrap().completed);
        assert_eq!(titles(&app), vec!["b", "c"]);

        app.tick();
        assert_eq!(titles(&app), vec!["b", "c"]);
        app.state.select(Some(0));
        app.move_selected(false);
        assert_eq!(titles(&app), vec!["b", "c"]);

        app.state.select(Some(1));
        app.move_selected(false);
        assert_eq!(titles(&app), vec!["c", "b"]);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn move_uses_task_position_not_row() {
        let clock = clock();
        let store = MemoryStore::new();
        let mut ctl = Controller::with_clock(&store, &clock);
        ctl.set_time_limit(1);
        ctl.add("short");
        ctl.set_time_limit(24);
        ctl.add("b");
        ctl.add("c");
        let mut app = App::new(ctl, PathBuf::from("."));
        clock.0.set(clock.0.get() + Duration::hours(2));

        // Row 1 is "b" on screen but position 0 in the live list.
        app.state.select(Some(1));
        app.move_selected(false);
        assert_eq!(titles(&app), vec!["b", "c"]);
        assert_eq!(app.state.selected(), Some(0));
    }
}
