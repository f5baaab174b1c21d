//! Filtered, ordered view of the task collection.

use crate::settings::Settings;
use crate::types::{Category, CategoryId, Task};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ViewOptions {
    pub search: String,
    pub category: Option<CategoryId>,
    pub pinned_first: bool,
    pub done_last: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            pinned_first: true,
            done_last: true,
        }
    }
}

impl ViewOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pinned_first: settings.pinned_first,
            done_last: settings.done_last,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: Option<CategoryId>) -> Self {
        self.category = category;
        self
    }

    pub fn is_filtering(&self) -> bool {
        self.category.is_some() || !self.search.trim().is_empty()
    }
}

/// Pinned tasks first, then unpinned with done tasks sunk to the bottom.
/// Relative order inside every group is the input order.
pub fn project<'a>(tasks: &'a [Task], options: &ViewOptions) -> Vec<&'a Task> {
    let needle = if options.search.trim().is_empty() {
        String::new()
    } else {
        options.search.to_lowercase()
    };
    let keep = |task: &Task| {
        options
            .category
            .as_ref()
            .is_none_or(|category| task.has_category(category))
            && matches_search(task, &needle)
    };

    let (pinned, unpinned): (Vec<&Task>, Vec<&Task>) = tasks
        .iter()
        .filter(|task| keep(task))
        .partition(|task| options.pinned_first && task.pinned);

    let unpinned = if options.done_last {
        let (open, done): (Vec<&Task>, Vec<&Task>) =
            unpinned.into_iter().partition(|task| !task.done);
        open.into_iter().chain(done).collect()
    } else {
        unpinned
    };

    pinned.into_iter().chain(unpinned).collect()
}

fn matches_search(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.name.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}

/// Categories present in the projection, most used first.
pub fn category_counts(tasks: &[Task], options: &ViewOptions) -> Vec<(Category, usize)> {
    let mut counts: Vec<(Category, usize)> = Vec::new();
    for task in project(tasks, options) {
        for category in &task.categories {
            match counts.iter_mut().find(|(known, _)| known.id == category.id) {
                Some((_, count)) => *count += 1,
                None => counts.push((category.clone(), 1)),
            }
        }
    }
    // stable: ties keep first-seen order
    counts.sort_by(|(_, left), (_, right)| right.cmp(left));
    counts
}
