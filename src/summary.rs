use chrono::NaiveDate;
use serde::Serialize;

use crate::types::Task;

#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub done: usize,
    pub percentage: u8,
    pub due_today: Vec<String>,
    pub overdue: usize,
}

impl Summary {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let total = tasks.len();
        let done = tasks.iter().filter(|task| task.done).count();
        let percentage = if total == 0 {
            0
        } else {
            // rounds half up
            ((done * 200 + total) / (2 * total)) as u8
        };

        let open = || tasks.iter().filter(|task| !task.done);
        let due_today = open()
            .filter(|task| task.deadline == Some(today))
            .map(|task| task.name.clone())
            .collect();
        let overdue = open()
            .filter(|task| task.deadline.is_some_and(|deadline| deadline < today))
            .count();

        Self {
            total,
            done,
            percentage,
            due_today,
            overdue,
        }
    }
}

pub fn deadline_status(deadline: NaiveDate, today: NaiveDate) -> String {
    let days = (deadline - today).num_days();
    match days {
        0 => "due today".to_string(),
        1 => "due tomorrow".to_string(),
        n if n > 0 => format!("due in {n} days"),
        -1 => "overdue by 1 day".to_string(),
        n => format!("overdue by {} days", -n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::task;

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).expect("valid date")
    }

    #[test]
    fn empty_collection_reports_zero_percent() {
        assert_eq!(Summary::compute(&[], day(10)), Summary::default());
    }

    #[test]
    fn counts_completion_and_deadlines() {
        let mut tasks = vec![
            task(1, "Pay rent", false, false),
            task(2, "Laundry", false, true),
            task(3, "Dentist", false, false),
            task(4, "Old chore", false, true),
        ];
        tasks[0].deadline = Some(day(10));
        tasks[1].deadline = Some(day(10));
        tasks[2].deadline = Some(day(3));
        tasks[3].deadline = Some(day(1));

        let summary = Summary::compute(&tasks, day(10));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.done, 2);
        assert_eq!(summary.percentage, 50);
        assert_eq!(summary.due_today, ["Pay rent"]);
        assert_eq!(summary.overdue, 1);
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let mut tasks = vec![
            task(1, "a", false, true),
            task(2, "b", false, true),
            task(3, "c", false, false),
        ];
        assert_eq!(Summary::compute(&tasks, day(1)).percentage, 67);

        tasks[1].done = false;
        assert_eq!(Summary::compute(&tasks, day(1)).percentage, 33);

        let halves: Vec<_> = (1..=8).map(|id| task(id, "t", false, id == 1)).collect();
        assert_eq!(Summary::compute(&halves, day(1)).percentage, 13);
    }

    #[test]
    fn describes_time_left() {
        assert_eq!(deadline_status(day(10), day(10)), "due today");
        assert_eq!(deadline_status(day(11), day(10)), "due tomorrow");
        assert_eq!(deadline_status(day(15), day(10)), "due in 5 days");
        assert_eq!(deadline_status(day(9), day(10)), "overdue by 1 day");
        assert_eq!(deadline_status(day(2), day(10)), "overdue by 8 days");
    }
}
