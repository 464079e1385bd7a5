use crate::application::clock::Clock;
use crate::application::error::AppError;
use crate::application::ids::next_id;
use crate::application::state_store::StateStore;
use crate::application::sync::SaveScheduler;
use crate::domain::error::{Field, ValidationError};
use crate::domain::models::Task;
use crate::domain::tasks::{completed_newest_first, pending_for_date};
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

pub struct TaskManager {
    store: Arc<StateStore>,
    saver: Arc<dyn SaveScheduler>,
    clock: Clock,
}

impl TaskManager {
    pub fn new(store: Arc<StateStore>, saver: Arc<dyn SaveScheduler>, clock: Clock) -> Self {
        Self { store, saver, clock }
    }

    pub fn create(
        &self,
        title: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
    ) -> Result<Task, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField(Field::TaskTitle).into());
        }
        let Some(date) = date else {
            return Err(ValidationError::MissingField(Field::TaskDate).into());
        };

        let task = Task {
            id: next_id("tsk"),
            title: title.to_string(),
            date,
            time,
            completed: false,
            completed_date: None,
        };
        self.store.update(|snapshot| snapshot.tasks.push(task.clone()))?;
        self.saver.schedule_save();

        tracing::info!(task_id = %task.id, %date, "created task");
        Ok(task)
    }

    /// Returns the updated task, or `None` when the id is unknown.
    pub fn toggle_complete(&self, task_id: &str) -> Result<Option<Task>, AppError> {
        let today = self.clock.today();
        let toggled = self.store.update(|snapshot| {
            snapshot.find_task_mut(task_id).map(|task| {
                task.toggle_complete(today);
                task.clone()
            })
        })?;

        let Some(task) = toggled else {
            return Ok(None);
        };
        self.saver.schedule_save();
        tracing::info!(task_id, completed = task.completed, "toggled task");
        Ok(Some(task))
    }

    pub fn delete(&self, task_id: &str) -> Result<bool, AppError> {
        let removed = self.store.update(|snapshot| {
            let before = snapshot.tasks.len();
            snapshot.tasks.retain(|task| task.id != task_id);
            snapshot.tasks.len() != before
        })?;
        if !removed {
            return Ok(false);
        }
        self.saver.schedule_save();
        tracing::info!(task_id, "deleted task");
        Ok(true)
    }

    pub fn list_pending(&self, date: NaiveDate) -> Result<Vec<Task>, AppError> {
        Ok(self.store.read(|snapshot| pending_for_date(&snapshot.tasks, date))?)
    }

    pub fn list_pending_today(&self) -> Result<Vec<Task>, AppError> {
        self.list_pending(self.clock.today())
    }

    pub fn list_completed(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.store.read(|snapshot| completed_newest_first(&snapshot.tasks))?)
    }

    pub fn list_all(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.store.read(|snapshot| snapshot.tasks.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{ManualClock, RecordingScheduler};

    struct Fixture {
        manager: TaskManager,
        saver: Arc<RecordingScheduler>,
        clock: ManualClock,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = ManualClock::at("2026-02-16T08:00:00Z");
            let saver = Arc::new(RecordingScheduler::default());
            let manager = TaskManager::new(
                Arc::new(StateStore::default()),
                saver.clone(),
                clock.clock(),
            );
            Self { manager, saver, clock }
        }
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
    }

    fn time(hour: u32, minute: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn create_task_rejects_empty_title() {
        let fixture = Fixture::new();
        let result = fixture.manager.create("   ", Some(date("2026-02-16")), None);
        match result {
            Err(AppError::Validation(error)) => assert_eq!(error.field(), Some(Field::TaskTitle)),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(fixture.saver.calls(), 0);
        assert!(fixture.manager.list_all().expect("list").is_empty());
    }

    #[test]
    fn create_task_requires_date() {
        let fixture = Fixture::new();
        match fixture.manager.create("Call plumber", None, time(9, 0)) {
            Err(AppError::Validation(error)) => assert_eq!(error.field(), Some(Field::TaskDate)),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(fixture.saver.calls(), 0);
    }

    #[test]
    fn create_and_list_tasks_roundtrip() {
        let fixture = Fixture::new();
        let created = fixture
            .manager
            .create("  Write integration tests ", Some(date("2026-02-16")), time(10, 0))
            .expect("create task");

        assert_eq!(created.title, "Write integration tests");
        assert!(!created.completed);
        assert_eq!(created.completed_date, None);
        assert_eq!(fixture.manager.list_all().expect("list"), vec![created]);
        assert_eq!(fixture.saver.calls(), 1);
    }

    #[test]
    fn list_pending_orders_timed_then_untimed() {
        let fixture = Fixture::new();
        let day = Some(date("2026-02-16"));
        let c = fixture.manager.create("C", day, None).expect("create c");
        let b = fixture.manager.create("B", day, time(14, 0)).expect("create b");
        let a = fixture.manager.create("A", day, time(9, 0)).expect("create a");
        fixture
            .manager
            .create("Other day", Some(date("2026-02-17")), time(8, 0))
            .expect("create other");

        let pending = fixture.manager.list_pending(date("2026-02-16")).expect("pending");
        assert_eq!(ids(&pending), vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]);
        assert_eq!(fixture.manager.list_pending_today().expect("today"), pending);
    }

    #[test]
    fn toggle_complete_moves_task_between_lists() {
        let fixture = Fixture::new();
        let task = fixture
            .manager
            .create("Review PR", Some(date("2026-02-16")), None)
            .expect("create");

        let done = fixture
            .manager
            .toggle_complete(&task.id)
            .expect("toggle")
            .expect("task exists");
        assert!(done.completed);
        assert_eq!(done.completed_date, Some(date("2026-02-16")));
        assert!(fixture.manager.list_pending(task.date).expect("pending").is_empty());
        assert_eq!(ids(&fixture.manager.list_completed().expect("completed")), vec![task.id.as_str()]);

        let reopened = fixture
            .manager
            .toggle_complete(&task.id)
            .expect("toggle")
            .expect("task exists");
        assert!(!reopened.completed);
        assert_eq!(reopened.completed_date, None);
        assert_eq!(fixture.saver.calls(), 3);
    }

    #[test]
    fn toggle_unknown_task_is_silent_noop() {
        let fixture = Fixture::new();
        assert_eq!(fixture.manager.toggle_complete("missing").expect("toggle"), None);
        assert_eq!(fixture.saver.calls(), 0);
    }

    #[test]
    fn list_completed_puts_latest_completion_first() {
        let fixture = Fixture::new();
        let day = Some(date("2026-02-15"));
        let x = fixture.manager.create("X", day, None).expect("create x");
        let y = fixture.manager.create("Y", day, None).expect("create y");

        fixture.manager.toggle_complete(&x.id).expect("complete x");
        fixture.clock.advance_days(1);
        fixture.manager.toggle_complete(&y.id).expect("complete y");

        let completed = fixture.manager.list_completed().expect("completed");
        assert_eq!(ids(&completed), vec![y.id.as_str(), x.id.as_str()]);
        assert_eq!(completed[0].completed_date, Some(date("2026-02-17")));
    }

    #[test]
    fn delete_twice_is_safe() {
        let fixture = Fixture::new();
        let task = fixture
            .manager
            .create("Throwaway", Some(date("2026-02-16")), None)
            .expect("create");

        assert!(fixture.manager.delete(&task.id).expect("first delete"));
        assert!(!fixture.manager.delete(&task.id).expect("second delete"));
        assert!(fixture.manager.list_all().expect("list").is_empty());
        assert_eq!(fixture.saver.calls(), 2);
    }
}
