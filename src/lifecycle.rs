//! The task collection and the transitions a task can go through.
//!
//! Every operation takes the current instant (and the expiration window
//! where one is needed) explicitly, so the whole module is deterministic.
//! Operations on an unknown id leave the collection untouched and report
//! `false`.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{to_millis, Task, TaskStatus};

/// Result of looking a task up by id prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
    Ambiguous(usize),
}

/// The three disjoint views of the collection at one instant.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// Active tasks in display order.
    pub active: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
    pub expired: Vec<&'a Task>,
}

impl<'a> Partition<'a> {
    pub fn get(&self, status: TaskStatus) -> &[&'a Task] {
        match status {
            TaskStatus::Active => &self.active,
            TaskStatus::Completed => &self.completed,
            TaskStatus::Expired => &self.expired,
        }
    }
}

/// Orders active tasks by their `order` hint. Tasks without one follow,
/// in collection order.
fn sort_for_display(active: &mut [&Task]) {
    active.sort_by_key(|t| t.order.unwrap_or(i64::MAX));
}

/// An ordered collection of tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        TaskList { tasks }
    }
}

impl TaskList {
    pub fn new() -> TaskList {
        TaskList::default()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_inner(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Finds the single task whose id starts with `prefix`.
    pub fn lookup(&self, prefix: &str) -> Lookup {
        if prefix.is_empty() {
            return Lookup::NotFound;
        }
        if let Some(t) = self.get(prefix) {
            return Lookup::Found(t.id.clone());
        }
        let matches: Vec<&Task> = self.tasks.iter().filter(|t| t.id.starts_with(prefix)).collect();
        match matches.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(matches[0].id.clone()),
            n => Lookup::Ambiguous(n),
        }
    }

    /// Appends a new task. Blank titles are rejected and yield `None`.
    pub fn add(&mut self, title: &str, now: DateTime<Utc>, window: Duration) -> Option<&Task> {
        let title = title.trim();
        if title.is_empty() {
            debug!("ignoring blank title");
            return None;
        }
        let task = Task::new(title.to_string(), now, window);
        debug!(id = %task.id, "task added");
        self.tasks.push(task);
        self.tasks.last()
    }

    pub fn complete(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.get_mut(id) {
            Some(t) => {
                t.mark_completed(now);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let len_before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != len_before
    }

    /// Pushes the deadline out to `now + window`. Completion is left alone.
    pub fn reset(&mut self, id: &str, now: DateTime<Utc>, window: Duration) -> bool {
        match self.get_mut(id) {
            Some(t) => {
                t.expires_at = to_millis(now) + window;
                true
            }
            None => false,
        }
    }

    /// Brings a completed or expired task back to active.
    pub fn readd(&mut self, id: &str, now: DateTime<Utc>, window: Duration) -> bool {
        match self.get_mut(id) {
            Some(t) => {
                t.reopen(now, window);
                true
            }
            None => false,
        }
    }

    pub fn toggle_recurring(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(t) => {
                t.is_recurring = !t.is_recurring;
                true
            }
            None => false,
        }
    }

    /// Gives each task of `arrangement` its position as `order`.
    ///
    /// Only tasks active at `now` are touched; other ids are ignored.
    pub fn reorder(&mut self, arrangement: &[String], now: DateTime<Utc>) -> bool {
        let mut changed = false;
        for (index, id) in arrangement.iter().enumerate() {
            if let Some(t) = self.get_mut(id) {
                if t.status(now) == TaskStatus::Active {
                    t.order = Some(index as i64);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Moves the active task at `source` to `destination`, both being
    /// positions in the displayed active list.
    pub fn move_active(&mut self, source: usize, destination: usize, now: DateTime<Utc>) -> bool {
        let mut ids: Vec<String> = self.active(now).iter().map(|t| t.id.clone()).collect();
        if source >= ids.len() || destination >= ids.len() {
            return false;
        }
        let moved = ids.remove(source);
        ids.insert(destination, moved);
        self.reorder(&ids, now)
    }

    /// Reopens every recurring task whose cooldown has passed.
    ///
    /// Returns the number of tasks reopened.
    pub fn sweep_recurring(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        let mut reopened = 0;
        for t in self.tasks.iter_mut().filter(|t| t.recurrence_due(now)) {
            t.reopen(now, window);
            debug!(id = %t.id, "recurring task reopened");
            reopened += 1;
        }
        reopened
    }

    /// Active tasks at `now`, in display order.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<&Task> {
        let mut active: Vec<&Task> =
            self.tasks.iter().filter(|t| t.status(now) == TaskStatus::Active).collect();
        sort_for_display(&mut active);
        active
    }

    /// Splits the collection by status at `now`.
    pub fn partition(&self, now: DateTime<Utc>) -> Partition<'_> {
        let mut p = Partition::default();
        for t in &self.tasks {
            match t.status(now) {
                TaskStatus::Active => p.active.push(t),
                TaskStatus::Completed => p.completed.push(t),
                TaskStatus::Expired => p.expired.push(t),
            }
        }
        sort_for_display(&mut p.active);
        p
    }
}
