use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const TASK_NAME_MAX_LENGTH: usize = 40;
pub const DESCRIPTION_MAX_LENGTH: usize = 350;
pub const CATEGORY_NAME_MAX_LENGTH: usize = 30;
pub const DEFAULT_TASK_COLOR: &str = "#88c9f2";

/// Category ids are opaque: the server emits integers, older clients minted
/// UUID strings. Both are kept as their textual form.
#[derive(Debug, Clone, Serialize, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(value) => CategoryId(value.to_string()),
            RawId::Text(value) => CategoryId(value),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub emoji: Option<String>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub done: bool,
    pub pinned: bool,
    pub color: String,
    pub emoji: Option<String>,
    pub date: NaiveDate,
    pub deadline: Option<NaiveDate>,
    pub categories: Vec<Category>,
    pub last_save: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn has_category(&self, category_id: &CategoryId) -> bool {
        self.categories
            .iter()
            .any(|category| &category.id == category_id)
    }

    pub fn short_id(&self) -> String {
        self.id.to_string().chars().take(8).collect()
    }
}

// Wire shapes exchanged with the REST service.

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    pub date: NaiveDate,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CategoryRef {
    pub name: String,
}

/// Full replacement body for `POST tasks/` and `PUT tasks/{id}/`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskPayload {
    pub name: String,
    pub description: String,
    pub completed: bool,
    pub categories: Vec<CategoryRef>,
    pub date: NaiveDate,
    pub deadline: Option<NaiveDate>,
}

impl TaskPayload {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            description: task.description.clone().unwrap_or_default(),
            completed: task.done,
            categories: category_refs(&task.categories),
            date: task.date,
            deadline: task.deadline,
        }
    }
}

pub fn category_refs(categories: &[Category]) -> Vec<CategoryRef> {
    categories
        .iter()
        .map(|category| CategoryRef {
            name: category.name.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CategoryPayload {
    pub name: String,
}

/// Values for a task that does not exist yet.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub categories: Vec<Category>,
    pub color: Option<String>,
    pub emoji: Option<String>,
}

/// Partial edit of an existing task. `None` leaves a field alone; for the
/// optional fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub done: Option<bool>,
    pub color: Option<String>,
    pub emoji: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub categories: Option<Vec<Category>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone().filter(|value| !value.is_empty());
        }
        if let Some(done) = self.done {
            task.done = done;
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
        if let Some(emoji) = &self.emoji {
            task.emoji = emoji.clone();
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(categories) = &self.categories {
            task.categories = categories.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn task(id: u128, name: &str, pinned: bool, done: bool) -> Task {
        Task {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            description: None,
            done,
            pinned,
            color: DEFAULT_TASK_COLOR.to_string(),
            emoji: None,
            date: NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date"),
            deadline: None,
            categories: Vec::new(),
            last_save: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn record(id: u128, name: &str, completed: bool) -> TaskRecord {
        TaskRecord {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            description: Some(String::new()),
            completed,
            categories: Vec::new(),
            date: NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date"),
            deadline: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn category(id: &str, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            emoji: None,
            color: "#1fff44".to_string(),
        }
    }
}
