use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, error, info};

use crate::lifecycle::{Lookup, Partition, TaskList};
use crate::settings::{clamp_time_limit, Settings};
use crate::storage::{KeyValueStore, Repository};

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, truncated to the millisecond precision tasks are
/// stored with.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Owns the task list and settings, applies user operations and keeps
/// the store in sync.
///
/// After every operation the recurring sweep runs and the task list is
/// saved. Saves are best effort: a failure is logged and the in-memory
/// state stays authoritative for the session.
pub struct Controller<S: KeyValueStore, C: Clock = SystemClock> {
    repo: Repository<S>,
    clock: C,
    tasks: TaskList,
    settings: Settings,
}

impl<S: KeyValueStore> Controller<S, SystemClock> {
    pub fn open(store: S) -> Self {
        Controller::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> Controller<S, C> {
    /// Loads both records from `store` and runs an initial sweep.
    pub fn with_clock(store: S, clock: C) -> Self {
        let repo = Repository::new(store);
        let tasks = TaskList::from(repo.load_tasks());
        let settings = repo.load_settings();
        info!(tasks = tasks.len(), time_limit = settings.default_time_limit, "state loaded");
        let mut controller = Controller { repo, clock, tasks, settings };
        controller.tick();
        controller
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    /// Partition of the current tasks at the clock's current instant.
    pub fn partition(&self) -> Partition<'_> {
        self.tasks.partition(self.clock.now())
    }

    pub fn lookup(&self, prefix: &str) -> Lookup {
        self.tasks.lookup(prefix)
    }

    /// Adds a task and returns its id, or `None` for a blank title.
    pub fn add(&mut self, title: &str) -> Option<String> {
        let now = self.clock.now();
        let id = self
            .tasks
            .add(title, now, self.settings.window())
            .map(|t| t.id.clone());
        self.commit(id.is_some());
        id
    }

    pub fn complete(&mut self, id: &str) -> bool {
        let changed = self.tasks.complete(id, self.clock.now());
        self.commit(changed)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let changed = self.tasks.delete(id);
        self.commit(changed)
    }

    pub fn reset(&mut self, id: &str) -> bool {
        let changed = self.tasks.reset(id, self.clock.now(), self.settings.window());
        self.commit(changed)
    }

    pub fn readd(&mut self, id: &str) -> bool {
        let changed = self.tasks.readd(id, self.clock.now(), self.settings.window());
        self.commit(changed)
    }

    pub fn toggle_recurring(&mut self, id: &str) -> bool {
        let changed = self.tasks.toggle_recurring(id);
        self.commit(changed)
    }

    pub fn reorder(&mut self, arrangement: &[String]) -> bool {
        let changed = self.tasks.reorder(arrangement, self.clock.now());
        self.commit(changed)
    }

    /// Drag-style move within the visible active list (0-based positions).
    pub fn move_active(&mut self, source: usize, destination: usize) -> bool {
        let changed = self.tasks.move_active(source, destination, self.clock.now());
        self.commit(changed)
    }

    /// Runs the recurring sweep and saves if anything was reopened.
    ///
    /// Returns the number of tasks reopened.
    pub fn tick(&mut self) -> usize {
        let reopened = self.tasks.sweep_recurring(self.clock.now(), self.settings.window());
        if reopened > 0 {
            info!(reopened, "recurring tasks reopened");
            self.persist_tasks();
        }
        reopened
    }

    /// Sets the expiration window, clamped to `1..=168` hours.
    ///
    /// Returns the value actually stored.
    pub fn set_time_limit(&mut self, hours: i64) -> i64 {
        let hours = clamp_time_limit(hours);
        self.settings.default_time_limit = hours;
        self.persist_settings();
        self.tick();
        hours
    }

    pub fn set_show_time_remaining(&mut self, show: bool) {
        self.settings.show_time_remaining = show;
        self.persist_settings();
    }

    pub fn set_show_time_completed(&mut self, show: bool) {
        self.settings.show_time_completed = show;
        self.persist_settings();
    }

    pub fn set_show_time_expired(&mut self, show: bool) {
        self.settings.show_time_expired = show;
        self.persist_settings();
    }

    fn commit(&mut self, changed: bool) -> bool {
        let reopened = self.tasks.sweep_recurring(self.clock.now(), self.settings.window());
        if changed || reopened > 0 {
            self.persist_tasks();
        } else {
            debug!("operation left tasks unchanged");
        }
        changed
    }

    fn persist_tasks(&self) {
        if let Err(e) = self.repo.save_tasks(self.tasks.as_slice()) {
            error!(error = %e, "failed to save tasks");
        }
    }

    fn persist_settings(&self) {
        if let Err(e) = self.repo.save_settings(&self.settings) {
            error!(error = %e, "failed to save settings");
        }
    }
}
