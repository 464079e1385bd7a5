use crate::domain::models::Task;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Open tasks for `date`: timed ones first by time, untimed ones after in stored order.
pub fn pending_for_date(tasks: &[Task], date: NaiveDate) -> Vec<Task> {
    let mut pending = tasks
        .iter()
        .filter(|task| !task.completed && task.date == date)
        .cloned()
        .collect::<Vec<_>>();
    pending.sort_by(compare_by_time);
    pending
}

/// Completed tasks, most recently completed first.
pub fn completed_newest_first(tasks: &[Task]) -> Vec<Task> {
    let mut completed = tasks
        .iter()
        .filter(|task| task.completed)
        .cloned()
        .collect::<Vec<_>>();
    completed.sort_by(|left, right| right.completed_date.cmp(&left.completed_date));
    completed
}

fn compare_by_time(left: &Task, right: &Task) -> Ordering {
    match (left.time, right.time) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
