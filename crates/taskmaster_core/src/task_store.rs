use crate::clock::{self, Clock, SystemClock};
use crate::error::AppError;
use crate::history::{DEFAULT_DISPLAY_LIMIT, HistoryLog};
use crate::model::{Filter, HistoryEntry, Priority, Task, TaskCounts};
use crate::storage::{DARK_MODE_KEY, HISTORY_KEY, KeyValueStore, Persistence, TASKS_KEY};
use time::Date;
use tracing::debug;

/// Owns the task collection, the history log and the dark-mode flag.
///
/// Every mutation writes the affected slice back to storage right after the
/// in-memory change. A failed write is not retried; the in-memory state is
/// kept and the error can be collected with [`TaskStore::take_save_error`].
pub struct TaskStore<S, C = SystemClock> {
    persistence: Persistence<S>,
    clock: C,
    tasks: Vec<Task>,
    history: HistoryLog,
    dark_mode: bool,
    filter: Filter,
    history_limit: usize,
    last_id: u64,
    save_error: Option<AppError>,
}

impl<S: KeyValueStore> TaskStore<S, SystemClock> {
    pub fn open(backend: S) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> TaskStore<S, C> {
    pub fn with_clock(backend: S, clock: C) -> Self {
        let mut store = Self {
            persistence: Persistence::new(backend),
            clock,
            tasks: Vec::new(),
            history: HistoryLog::new(),
            dark_mode: false,
            filter: Filter::All,
            history_limit: DEFAULT_DISPLAY_LIMIT,
            last_id: 0,
            save_error: None,
        };
        store.reload();
        store
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Re-reads every slice from storage. The session filter is kept.
    pub fn reload(&mut self) {
        self.tasks = self.persistence.load_or(TASKS_KEY, Vec::new());
        self.history = HistoryLog::from_entries(self.persistence.load_or(HISTORY_KEY, Vec::new()));
        self.dark_mode = self.persistence.load_flag(DARK_MODE_KEY);
        self.last_id = self
            .tasks
            .iter()
            .chain(self.history.entries().iter().map(|entry| &entry.task))
            .map(|task| task.id)
            .max()
            .unwrap_or(0);
        debug!(
            tasks = self.tasks.len(),
            history = self.history.len(),
            "loaded task state"
        );
    }

    pub fn add_task(&mut self, text: &str, deadline: Option<Date>, priority: Priority) -> Option<Task> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("ignoring task with blank text");
            return None;
        }

        let task = Task {
            id: self.next_id(),
            text: trimmed.to_string(),
            completed: false,
            deadline,
            priority,
        };

        self.tasks.insert(0, task.clone());
        debug!(id = task.id, "added task");
        self.persist_tasks();

        Some(task)
    }

    pub fn toggle_task(&mut self, id: u64) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        let updated = task.clone();
        debug!(id, completed = updated.completed, "toggled task");

        if updated.completed {
            let entry = HistoryEntry::completed(updated.clone(), self.now_timestamp());
            self.history.record(entry);
            self.persist_history();
        }
        self.persist_tasks();

        Some(updated)
    }

    pub fn delete_task(&mut self, id: u64) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;

        let entry = HistoryEntry::deleted(self.tasks[index].clone(), self.now_timestamp());
        self.history.record(entry);
        self.persist_history();

        let removed = self.tasks.remove(index);
        debug!(id, "deleted task");
        self.persist_tasks();

        Some(removed)
    }

    /// Drops every completed task. History was written when each one was
    /// completed, so nothing is recorded here.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();
        debug!(removed, "cleared completed tasks");
        self.persist_tasks();
        removed
    }

    pub fn filtered_view(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|task| filter.matches(task)).collect()
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.filtered_view(self.filter)
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn counts(&self) -> TaskCounts {
        counts(&self.tasks, self.today())
    }

    pub fn is_overdue(&self, task: &Task) -> bool {
        is_overdue(task, self.today())
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        if let Err(err) = self.persistence.save_flag(DARK_MODE_KEY, self.dark_mode) {
            self.save_error = Some(err);
        }
        self.dark_mode
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn recent_history(&self) -> &[HistoryEntry] {
        self.history.recent(self.history_limit)
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    pub fn take_save_error(&mut self) -> Option<AppError> {
        self.save_error.take()
    }

    fn next_id(&mut self) -> u64 {
        let candidate = clock::unix_millis(self.clock.now());
        self.last_id = if candidate > self.last_id {
            candidate
        } else {
            self.last_id + 1
        };
        self.last_id
    }

    fn now_timestamp(&self) -> String {
        clock::timestamp(self.clock.now())
    }

    fn persist_tasks(&mut self) {
        if let Err(err) = self.persistence.save(TASKS_KEY, &self.tasks) {
            self.save_error = Some(err);
        }
    }

    fn persist_history(&mut self) {
        if let Err(err) = self.persistence.save(HISTORY_KEY, self.history.entries()) {
            self.save_error = Some(err);
        }
    }
}

pub fn is_overdue(task: &Task, today: Date) -> bool {
    task.is_overdue(today)
}

pub fn counts(tasks: &[Task], today: Date) -> TaskCounts {
    tasks.iter().fold(TaskCounts::default(), |mut counts, task| {
        if task.completed {
            counts.completed += 1;
        } else {
            counts.active += 1;
        }
        if task.is_overdue(today) {
            counts.overdue += 1;
        }
        counts
    })
}

#[cfg(test)]
mod tests {
    use super::{TaskStore, counts, is_overdue};
    use crate::clock::{FixedClock, unix_millis};
    use crate::error::AppError;
    use crate::model::{Filter, HistoryEntry, Priority, Task};
    use crate::storage::{
        DARK_MODE_KEY, HISTORY_KEY, KeyValueStore, MemoryStore, Persistence, TASKS_KEY,
    };
    use std::cell::Cell;
    use time::OffsetDateTime;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-03-10 09:00 UTC);

    fn store(backend: &MemoryStore) -> TaskStore<&MemoryStore, FixedClock> {
        TaskStore::with_clock(backend, FixedClock(NOW))
    }

    fn texts(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|task| task.text.clone()).collect()
    }

    #[test]
    fn add_task_prepends_newest_first() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);

        store.add_task("A", None, Priority::Medium).unwrap();
        store.add_task("B", None, Priority::Medium).unwrap();
        store.add_task("C", None, Priority::Low).unwrap();

        assert_eq!(store.tasks().len(), 3);
        assert_eq!(texts(&store.filtered_view(Filter::All)), vec!["C", "B", "A"]);
    }

    #[test]
    fn add_task_ignores_blank_text() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);

        assert!(store.add_task("", None, Priority::Medium).is_none());
        assert!(store.add_task("   ", None, Priority::High).is_none());
        assert!(store.tasks().is_empty());
        assert_eq!(backend.read(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn add_task_trims_and_defaults_fields() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);

        let task = store.add_task("  Buy milk ", None, Priority::default()).unwrap();

        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.deadline, None);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn ids_stay_unique_within_the_same_millisecond() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);

        let first = store.add_task("A", None, Priority::Medium).unwrap();
        let second = store.add_task("B", None, Priority::Medium).unwrap();
        let third = store.add_task("C", None, Priority::Medium).unwrap();

        assert_eq!(first.id, unix_millis(NOW));
        assert_eq!(second.id, first.id + 1);
        assert_eq!(third.id, second.id + 1);
    }

    #[test]
    fn ids_never_reuse_values_from_storage() {
        let future_id = unix_millis(NOW) + 500;
        let backend = MemoryStore::with_values([(
            TASKS_KEY,
            format!(r#"[{{"id":{future_id},"text":"later","completed":false,"deadline":"","priority":"Low"}}]"#),
        )]);
        let mut store = store(&backend);

        let task = store.add_task("next", None, Priority::Medium).unwrap();
        assert_eq!(task.id, future_id + 1);
    }

    #[test]
    fn write_report_scenario_is_overdue() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);

        let task = store
            .add_task("Write report", Some(date!(2024 - 01 - 01)), Priority::High)
            .unwrap();

        assert_eq!(task.text, "Write report");
        assert!(!task.completed);
        assert_eq!(task.deadline, Some(date!(2024 - 01 - 01)));
        assert_eq!(task.priority, Priority::High);
        assert!(store.is_overdue(&task));
        assert_eq!(store.counts().overdue, 1);
        assert_eq!(store.counts().active, 1);
    }

    #[test]
    fn toggle_records_history_only_on_completion() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let task = store.add_task("A", None, Priority::Medium).unwrap();

        let done = store.toggle_task(task.id).unwrap();
        assert!(done.completed);
        assert_eq!(store.history().len(), 1);

        let undone = store.toggle_task(task.id).unwrap();
        assert!(!undone.completed);
        assert_eq!(store.history().len(), 1);

        store.toggle_task(task.id).unwrap();
        assert_eq!(store.history().len(), 2);
        assert!(
            store
                .history()
                .entries()
                .iter()
                .all(|entry| entry.completed_at() == Some("2024-03-10T09:00:00Z"))
        );
    }

    #[test]
    fn completing_a_task_updates_views_and_history() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let a = store.add_task("A", None, Priority::Medium).unwrap();
        store.add_task("B", None, Priority::Medium).unwrap();

        store.toggle_task(a.id).unwrap();

        assert_eq!(texts(&store.filtered_view(Filter::Completed)), vec!["A"]);
        assert_eq!(texts(&store.filtered_view(Filter::Active)), vec!["B"]);
        let history = store.history().entries();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].task.text, "A");
        assert!(history[0].task.completed);
        assert!(history[0].completed_at().is_some());
        assert!(history[0].deleted_at().is_none());
    }

    #[test]
    fn toggle_unknown_id_is_a_no_op() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        store.add_task("A", None, Priority::Medium).unwrap();

        assert!(store.toggle_task(1).is_none());
        assert!(store.history().is_empty());
        assert_eq!(store.counts().completed, 0);
    }

    #[test]
    fn delete_records_snapshot_regardless_of_completion() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let open = store.add_task("open", None, Priority::Low).unwrap();
        let done = store.add_task("done", None, Priority::High).unwrap();
        store.toggle_task(done.id).unwrap();

        let removed = store.delete_task(open.id).unwrap();
        assert_eq!(removed.id, open.id);
        assert_eq!(store.tasks().len(), 1);
        let latest = &store.history().entries()[0];
        assert_eq!(latest.task, open);
        assert_eq!(latest.deleted_at(), Some("2024-03-10T09:00:00Z"));
        assert_eq!(latest.completed_at(), None);

        store.delete_task(done.id).unwrap();
        let latest = &store.history().entries()[0];
        assert!(latest.task.completed);
        assert!(latest.deleted_at().is_some());
        assert!(store.tasks().is_empty());
        assert_eq!(store.history().len(), 3);
    }

    #[test]
    fn delete_unknown_id_is_a_no_op() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        store.add_task("A", None, Priority::Medium).unwrap();

        assert!(store.delete_task(42).is_none());
        assert_eq!(store.tasks().len(), 1);
        assert!(store.history().is_empty());
    }

    #[test]
    fn clear_completed_removes_only_completed_without_history() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let a = store.add_task("A", None, Priority::Medium).unwrap();
        store.add_task("B", None, Priority::Medium).unwrap();
        let c = store.add_task("C", None, Priority::Medium).unwrap();
        store.toggle_task(a.id).unwrap();
        store.toggle_task(c.id).unwrap();
        let history_before = store.history().len();

        let removed = store.clear_completed();

        assert_eq!(removed, 2);
        assert_eq!(texts(&store.filtered_view(Filter::All)), vec!["B"]);
        assert!(store.filtered_view(Filter::Completed).is_empty());
        assert_eq!(store.history().len(), history_before);
    }

    #[test]
    fn session_filter_drives_visible_tasks() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let a = store.add_task("A", None, Priority::Medium).unwrap();
        store.add_task("B", None, Priority::Medium).unwrap();
        store.toggle_task(a.id).unwrap();

        assert_eq!(store.filter(), Filter::All);
        assert_eq!(texts(&store.visible_tasks()), vec!["B", "A"]);

        store.set_filter(Filter::Active);
        assert_eq!(texts(&store.visible_tasks()), vec!["B"]);
    }

    #[test]
    fn counts_classify_tasks() {
        let today = date!(2024 - 03 - 10);
        let tasks = vec![
            Task {
                id: 1,
                text: "late".to_string(),
                completed: false,
                deadline: Some(date!(2024 - 03 - 09)),
                priority: Priority::High,
            },
            Task {
                id: 2,
                text: "today".to_string(),
                completed: false,
                deadline: Some(today),
                priority: Priority::Medium,
            },
            Task {
                id: 3,
                text: "done late".to_string(),
                completed: true,
                deadline: Some(date!(2024 - 01 - 01)),
                priority: Priority::Low,
            },
        ];

        let counts = counts(&tasks, today);
        assert_eq!(counts.active, 2);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.overdue, 1);
        assert!(is_overdue(&tasks[0], today));
        assert!(!is_overdue(&tasks[1], today));
        assert!(!is_overdue(&tasks[2], today));
    }

    #[test]
    fn every_mutation_is_persisted() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let a = store.add_task("A", Some(date!(2024 - 04 - 01)), Priority::High).unwrap();
        store.add_task("B", None, Priority::Low).unwrap();
        store.toggle_task(a.id).unwrap();
        store.toggle_dark_mode();

        let reopened = TaskStore::with_clock(&backend, FixedClock(NOW));
        assert_eq!(reopened.tasks(), store.tasks());
        assert_eq!(reopened.history(), store.history());
        assert!(reopened.dark_mode());
        assert_eq!(backend.read(DARK_MODE_KEY).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn history_round_trips_through_storage() {
        let backend = MemoryStore::new();
        let mut store = store(&backend);
        let a = store.add_task("A", None, Priority::Medium).unwrap();
        let b = store.add_task("B", None, Priority::Medium).unwrap();
        store.toggle_task(a.id).unwrap();
        store.delete_task(b.id).unwrap();

        let persistence = Persistence::new(&backend);
        let loaded: Vec<HistoryEntry> = persistence.load_or(HISTORY_KEY, Vec::new());
        assert_eq!(loaded.as_slice(), store.history().entries());
        assert_eq!(loaded[0].deleted_at(), Some("2024-03-10T09:00:00Z"));
        assert_eq!(loaded[1].completed_at(), Some("2024-03-10T09:00:00Z"));
    }

    #[test]
    fn corrupt_storage_starts_empty() {
        let backend = MemoryStore::with_values([
            (TASKS_KEY, "not json"),
            (HISTORY_KEY, "{\"broken\": true}"),
            (DARK_MODE_KEY, "maybe"),
        ]);
        let store = store(&backend);

        assert!(store.tasks().is_empty());
        assert!(store.history().is_empty());
        assert!(!store.dark_mode());
    }

    #[test]
    fn recent_history_uses_display_limit() {
        let backend = MemoryStore::new();
        let mut store = store(&backend).with_history_limit(2);
        for text in ["A", "B", "C"] {
            let task = store.add_task(text, None, Priority::Medium).unwrap();
            store.delete_task(task.id).unwrap();
        }

        let recent: Vec<&str> = store
            .recent_history()
            .iter()
            .map(|entry| entry.task.text.as_str())
            .collect();
        assert_eq!(recent, vec!["C", "B"]);
        assert_eq!(store.history().len(), 3);
    }

    struct FailingWrites {
        inner: MemoryStore,
        fail: Cell<bool>,
    }

    impl KeyValueStore for FailingWrites {
        fn read(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), AppError> {
            if self.fail.get() {
                return Err(AppError::io("read-only storage"));
            }
            self.inner.write(key, value)
        }
    }

    #[test]
    fn failed_write_keeps_memory_state_and_reports_once() {
        let backend = FailingWrites {
            inner: MemoryStore::new(),
            fail: Cell::new(true),
        };
        let mut store = TaskStore::with_clock(&backend, FixedClock(NOW));

        let task = store.add_task("A", None, Priority::Medium).unwrap();
        assert_eq!(store.tasks(), &[task]);
        assert_eq!(store.take_save_error().unwrap().code(), "io_error");
        assert!(store.take_save_error().is_none());

        backend.fail.set(false);
        store.clear_completed();
        assert!(store.take_save_error().is_none());
        assert!(backend.inner.read(TASKS_KEY).unwrap().is_some());
    }
}
