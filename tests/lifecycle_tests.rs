use ephemeral::controller::{Clock, Controller, SystemClock};
use ephemeral::lifecycle::TaskList;
use ephemeral::models::TaskStatus;
use ephemeral::sections::{classify_in, group_by_section_in, SectionField, TimeSection};
use ephemeral::settings::Settings;
use ephemeral::storage::{FileStore, MemoryStore, Repository};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cell::Cell;

struct TestClock(Cell<DateTime<Utc>>);

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 15, 0, 0).unwrap()
}

#[test]
fn test_status_changes_only_when_crossing_expiry() {
    let mut list = TaskList::new();
    let t = list.add("x", start(), Duration::hours(6)).unwrap().clone();
    for minutes in (0..(6 * 60)).step_by(17) {
        assert_eq!(t.status(start() + Duration::minutes(minutes)), TaskStatus::Active);
    }
    for hours in 6..48 {
        assert_eq!(t.status(start() + Duration::hours(hours)), TaskStatus::Expired);
    }
}

#[test]
fn test_bucket_examples() {
    let now = start();
    assert_eq!(classify_in(now, now, &Utc), TimeSection::Today);
    assert_eq!(classify_in(now - Duration::days(10), now, &Utc), TimeSection::LastWeek);
    assert_eq!(classify_in(now - Duration::days(25), now, &Utc), TimeSection::Last30Days);
    assert_eq!(classify_in(now - Duration::days(400), now, &Utc), TimeSection::All);
}

#[test]
fn test_expired_view_groups_by_expiry() {
    let clock = TestClock(Cell::new(start()));
    let store = MemoryStore::new();
    let mut ctl = Controller::with_clock(&store, &clock);
    ctl.set_time_limit(1);
    ctl.add("old");
    clock.0.set(start() + Duration::days(20));
    ctl.add("recent");
    clock.0.set(start() + Duration::days(20) + Duration::hours(3));

    let partition = ctl.partition();
    assert_eq!(partition.expired.len(), 2);
    let grouped = group_by_section_in(partition.expired.iter().copied(), SectionField::ExpiresAt, ctl.now(), &Utc);
    let by_section: Vec<(TimeSection, Vec<&str>)> = grouped
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(s, v)| (s, v.iter().map(|t| t.title.as_str()).collect()))
        .collect();
    assert_eq!(
        by_section,
        vec![(TimeSection::Today, vec!["recent"]), (TimeSection::Last30Days, vec!["old"])]
    );
}

#[test]
fn test_reorder_leaves_other_tasks_alone() {
    let clock = TestClock(Cell::new(start()));
    let store = MemoryStore::new();
    let mut ctl = Controller::with_clock(&store, &clock);
    let a = ctl.add("a").unwrap();
    let b = ctl.add("b").unwrap();
    let done = ctl.add("done").unwrap();
    ctl.complete(&done);
    let before = ctl.tasks().get(&done).unwrap().clone();

    assert!(ctl.reorder(&[b.clone(), done.clone(), a.clone()]));
    assert_eq!(ctl.tasks().get(&done).unwrap(), &before);
    assert_eq!(ctl.tasks().get(&b).unwrap().order, Some(0));
    assert_eq!(ctl.tasks().get(&a).unwrap().order, Some(2));
    let titles: Vec<&str> = ctl.partition().active.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["b", "a"]);
}

#[test]
fn test_window_change_applies_to_new_deadlines() {
    let clock = TestClock(Cell::new(start()));
    let store = MemoryStore::new();
    let mut ctl = Controller::with_clock(&store, &clock);
    let before = ctl.add("before").unwrap();
    assert_eq!(ctl.set_time_limit(0), 1);
    let after = ctl.add("after").unwrap();
    assert_eq!(ctl.tasks().get(&before).unwrap().expires_at, start() + Duration::hours(24));
    assert_eq!(ctl.tasks().get(&after).unwrap().expires_at, start() + Duration::hours(1));
}

#[test]
fn test_file_round_trip_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let clock = TestClock(Cell::new(start()));
    let mut ctl = Controller::with_clock(FileStore::new(dir.path()), &clock);
    let a = ctl.add("a").unwrap();
    ctl.add("b");
    ctl.toggle_recurring(&a);
    ctl.complete(&a);
    ctl.move_active(0, 0);
    ctl.set_show_time_completed(false);

    let repo = Repository::new(FileStore::new(dir.path()));
    assert_eq!(repo.load_tasks(), ctl.tasks().as_slice());
    assert_eq!(&repo.load_settings(), ctl.settings());
    assert_ne!(repo.load_settings(), Settings::default());

    repo.save_tasks(&repo.load_tasks()).unwrap();
    assert_eq!(repo.load_tasks(), ctl.tasks().as_slice());
}

#[test]
fn test_wall_clock_round_trip_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctl = Controller::with_clock(FileStore::new(dir.path()), SystemClock);
    let a = ctl.add("a").unwrap();
    ctl.add("b");
    ctl.complete(&a);

    let reloaded = Controller::with_clock(FileStore::new(dir.path()), SystemClock);
    assert_eq!(reloaded.tasks(), ctl.tasks());
}
