//! In-progress add-task form values kept between invocations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{Category, CategoryId, TaskDraft};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct TaskFormDraft {
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub color: Option<String>,
    pub emoji: Option<String>,
    pub category_ids: Vec<CategoryId>,
}

impl TaskFormDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Ids missing from `known` are skipped.
    pub fn to_task_draft(&self, known: &[Category]) -> TaskDraft {
        let categories = self
            .category_ids
            .iter()
            .filter_map(|id| {
                let found = known.iter().find(|category| &category.id == id).cloned();
                if found.is_none() {
                    warn!(category_id = %id, "draft references an unknown category");
                }
                found
            })
            .collect();

        TaskDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            deadline: self.deadline,
            categories,
            color: self.color.clone(),
            emoji: self.emoji.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::cache_dir()?;
        path.push("todo-deck");
        path.push("draft.json");
        Some(path)
    }

    pub fn open_default() -> anyhow::Result<Self> {
        Self::default_path()
            .map(Self::new)
            .ok_or_else(|| anyhow!("unable to determine cache directory"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable drafts load as the empty form.
    pub fn load(&self) -> TaskFormDraft {
        if !self.path.exists() {
            return TaskFormDraft::default();
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(draft) => draft,
                Err(error) => {
                    warn!(
                        "failed to parse task draft '{}': {}",
                        self.path.display(),
                        error
                    );
                    TaskFormDraft::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read task draft '{}': {}",
                    self.path.display(),
                    error
                );
                TaskFormDraft::default()
            }
        }
    }

    pub fn save(&self, draft: &TaskFormDraft) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("invalid draft path"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache directory '{}'", parent.display()))?;

        let contents =
            serde_json::to_string_pretty(draft).context("failed to serialize task draft")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).with_context(|| {
            format!("failed to write temporary draft '{}'", tmp_path.display())
        })?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to replace task draft '{}'", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error)
                .with_context(|| format!("failed to remove task draft '{}'", self.path.display())),
        }
    }
}
