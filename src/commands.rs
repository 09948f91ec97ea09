use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::controller::{Clock, Controller};
use crate::lifecycle::Lookup;
use crate::models::{format_local, TaskStatus};
use crate::sections::{group_by_section, SectionField};
use crate::share::{default_targets, share_payload, share_via, ShareTarget};
use crate::storage::KeyValueStore;

/// Resolves an id prefix to a full task id, reporting problems on stderr.
fn resolve<S: KeyValueStore, C: Clock>(ctl: &Controller<S, C>, prefix: &str, silent: bool) -> Option<String> {
    match ctl.lookup(prefix) {
        Lookup::Found(id) => Some(id),
        Lookup::NotFound => {
            if !silent { eprintln!("Task {} not found.", prefix); }
            None
        }
        Lookup::Ambiguous(n) => {
            if !silent { eprintln!("Id '{}' matches {} tasks, use more characters.", prefix, n); }
            None
        }
    }
}

/// Adds a new task. Blank titles are ignored.
pub fn cmd_add<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, title: &str, silent: bool) -> Option<String> {
    let id = ctl.add(title);
    if silent {
        return id;
    }
    match id.as_deref().and_then(|id| ctl.tasks().get(id)) {
        Some(t) => println!("Task added (id = {}), expires in {}h.", t.short_id(), ctl.settings().default_time_limit),
        None => eprintln!("Task title is empty, nothing added."),
    }
    id
}

/// Marks a task as complete by id prefix.
pub fn cmd_complete<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, id: &str, silent: bool) -> bool {
    let Some(full) = resolve(ctl, id, silent) else { return false };
    let done = ctl.complete(&full);
    if done && !silent { println!("Task {} marked as complete.", id); }
    done
}

/// Removes a task by id prefix.
pub fn cmd_delete<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, id: &str, silent: bool) -> bool {
    let Some(full) = resolve(ctl, id, silent) else { return false };
    let done = ctl.delete(&full);
    if done && !silent { println!("Task {} removed.", id); }
    done
}

/// Restarts the expiration timer of a task.
pub fn cmd_reset<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, id: &str, silent: bool) -> bool {
    let Some(full) = resolve(ctl, id, silent) else { return false };
    let done = ctl.reset(&full);
    if done && !silent {
        println!("Task {} timer reset to {}h.", id, ctl.settings().default_time_limit);
    }
    done
}

/// Moves a completed or expired task back to active.
pub fn cmd_readd<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, id: &str, silent: bool) -> bool {
    let Some(full) = resolve(ctl, id, silent) else { return false };
    let done = ctl.readd(&full);
    if done && !silent { println!("Task {} is active again.", id); }
    done
}

/// Flips whether a task repeats daily.
pub fn cmd_repeat<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, id: &str, silent: bool) -> bool {
    let Some(full) = resolve(ctl, id, silent) else { return false };
    let done = ctl.toggle_recurring(&full);
    if done && !silent {
        let recurring = ctl.tasks().get(&full).map(|t| t.is_recurring).unwrap_or(false);
        if recurring {
            println!("Task {} now repeats daily.", id);
        } else {
            println!("Task {} no longer repeats.", id);
        }
    }
    done
}

/// Moves the active task at position `from` to position `to` (both 1-based,
/// as shown by `list`).
pub fn cmd_move<S: KeyValueStore, C: Clock>(ctl: &mut Controller<S, C>, from: usize, to: usize, silent: bool) -> bool {
    if from == 0 || to == 0 {
        if !silent { eprintln!("Positions start at 1."); }
        return false;
    }
    let done = ctl.move_active(from - 1, to - 1);
    if !silent {
        if done {
            println!("Moved task from position {} to {}.", from, to);
        } else {
            eprintln!("No active task at position {} or {}.", from, to);
        }
    }
    done
}

/// Shows the settings, applying any given changes first.
pub fn cmd_settings<S: KeyValueStore, C: Clock>(
    ctl: &mut Controller<S, C>,
    hours: Option<i64>,
    show_remaining: Option<bool>,
    show_completed: Option<bool>,
    show_expired: Option<bool>,
    silent: bool,
) {
    if let Some(h) = hours {
        let stored = ctl.set_time_limit(h);
        if stored != h && !silent {
            eprintln!("Time limit must be between 1 and 168 hours, using {}.", stored);
        }
    }
    if let Some(v) = show_remaining { ctl.set_show_time_remaining(v); }
    if let Some(v) = show_completed { ctl.set_show_time_completed(v); }
    if let Some(v) = show_expired { ctl.set_show_time_expired(v); }
    if silent {
        return;
    }

    let s = ctl.settings();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["Default time limit (hours)".to_string(), s.default_time_limit.to_string()]);
    table.add_row(vec!["Show time remaining".to_string(), s.show_time_remaining.to_string()]);
    table.add_row(vec!["Show time completed".to_string(), s.show_time_completed.to_string()]);
    table.add_row(vec!["Show time expired".to_string(), s.show_time_expired.to_string()]);
    println!("{table}");
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels.iter().map(|l| Cell::new(l).add_attribute(Attribute::Bold)).collect()
}

/// Lists the tasks of one tab in a formatted table.
///
/// Active tasks are shown in display order with their position; completed
/// and expired tasks are grouped into time sections.
pub fn cmd_list<S: KeyValueStore, C: Clock>(ctl: &Controller<S, C>, tab: TaskStatus) {
    let now = ctl.now();
    let settings = ctl.settings();
    let partition = ctl.partition();
    let tasks = partition.get(tab);
    if tasks.is_empty() {
        println!("No {} tasks.", tab.label().to_lowercase());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);

    match SectionField::for_status(tab) {
        None => {
            table.set_header(header(&["#", "ID", "Title", "Time Left", "Repeat"]));
            for (i, t) in tasks.iter().enumerate() {
                let left = if settings.show_time_remaining {
                    t.time_remaining(now).unwrap_or_default()
                } else {
                    String::new()
                };
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(t.short_id()),
                    Cell::new(&t.title),
                    Cell::new(left).fg(Color::Blue),
                    Cell::new(if t.is_recurring { "★" } else { "" }).fg(Color::Blue),
                ]);
            }
        }
        Some(field) => {
            let (label, show) = match field {
                SectionField::CompletedAt => ("Completed", settings.show_time_completed),
                SectionField::ExpiresAt => ("Expired", settings.show_time_expired),
            };
            table.set_header(header(&["ID", "Title", label]));
            for (section, items) in group_by_section(tasks.iter().copied(), field, now) {
                if items.is_empty() {
                    continue;
                }
                table.add_row(vec![
                    Cell::new(section.label()).add_attribute(Attribute::Bold).fg(Color::Cyan),
                    Cell::new(""),
                    Cell::new(""),
                ]);
                for t in items {
                    let when = match field {
                        SectionField::CompletedAt => t.completed_at,
                        SectionField::ExpiresAt => Some(t.expires_at),
                    };
                    let when = match (show, when) {
                        (true, Some(ts)) => format_local(ts),
                        _ => String::new(),
                    };
                    table.add_row(vec![
                        Cell::new(t.short_id()),
                        Cell::new(&t.title).fg(Color::Grey),
                        Cell::new(when),
                    ]);
                }
            }
        }
    }

    println!("{table}");
}

/// Shares the active tasks through the given targets.
///
/// Returns the message shown to the user, success or not.
pub fn cmd_share_with<S: KeyValueStore, C: Clock>(
    ctl: &Controller<S, C>,
    targets: &[Box<dyn ShareTarget>],
) -> Result<String, String> {
    let partition = ctl.partition();
    match share_payload(&partition.active) {
        None => Ok("No tasks to share".to_string()),
        Some(payload) => share_via(targets, &payload).map_err(|e| format!("Failed to share tasks: {}", e)),
    }
}

/// Shares the active tasks using the targets available on this machine.
pub fn cmd_share<S: KeyValueStore, C: Clock>(ctl: &Controller<S, C>) {
    match cmd_share_with(ctl, &default_targets()) {
        Ok(msg) => println!("{}", msg),
        Err(msg) => eprintln!("{}", msg),
    }
}

/// Text shown by `about` and the TUI about popup.
pub fn about_text(data_dir: &Path) -> String {
    format!(
        "Ephemeral {}\n\
         A task list where tasks expire unless you finish them.\n\
         Recurring tasks come back a day after you complete them.\n\
         Data: {}",
        env!("CARGO_PKG_VERSION"),
        data_dir.display()
    )
}

pub fn cmd_about(data_dir: &Path) {
    println!("{}", about_text(data_dir));
}
