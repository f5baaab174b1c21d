//! Session task collection.
//!
//! Every mutation goes through the remote client first and is only committed
//! locally once the server accepted it.

mod errors;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{RemoteError, TaskApi};
use crate::types::{
    Category, CategoryDraft, CategoryId, CategoryPayload, CategoryRecord, DEFAULT_TASK_COLOR,
    Task, TaskDraft, TaskPatch, TaskPayload, TaskRecord, category_refs,
};

pub use errors::{
    StoreError, StoreResult, ValidationError, validate_category_name, validate_task_fields,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StoreOptions {
    pub palette: Vec<String>,
    pub default_task_color: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            palette: Vec::new(),
            default_task_color: DEFAULT_TASK_COLOR.to_string(),
        }
    }
}

/// Result of a concurrent bulk mutation.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<(Uuid, StoreError)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct TaskStore<C> {
    client: Arc<C>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    options: StoreOptions,
}

impl<C> TaskStore<C>
where
    C: TaskApi + 'static,
{
    pub fn new(client: C, options: StoreOptions) -> Self {
        Self::with_shared_client(Arc::new(client), options)
    }

    pub fn with_shared_client(client: Arc<C>, options: StoreOptions) -> Self {
        Self {
            client,
            tasks: Vec::new(),
            categories: Vec::new(),
            options,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| &category.id == id)
    }

    /// Fetches the task list. Failures are logged and leave an empty list.
    /// Tasks already known keep their pin, color, emoji and last save.
    pub async fn load(&mut self) -> usize {
        match self.client.list_tasks().await {
            Ok(records) => {
                let mut seen = HashSet::new();
                let tasks: Vec<Task> = records
                    .into_iter()
                    .filter(|record| seen.insert(record.id))
                    .map(|record| {
                        let mut task = self.task_from_record(record);
                        if let Some(known) = self.task(task.id) {
                            task.pinned = known.pinned;
                            task.color = known.color.clone();
                            task.emoji = known.emoji.clone();
                            task.last_save = known.last_save;
                        }
                        task
                    })
                    .collect();
                info!(count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch tasks; starting with an empty list");
                self.tasks.clear();
            }
        }
        self.tasks.len()
    }

    pub async fn load_categories(&mut self) -> usize {
        match self.client.list_categories().await {
            Ok(records) => {
                let mut seen = HashSet::new();
                let categories: Vec<Category> = records
                    .into_iter()
                    .filter(|record| seen.insert(record.id.clone()))
                    .enumerate()
                    .map(|(index, record)| Category {
                        color: self.palette_color(index),
                        id: record.id,
                        name: record.name,
                        emoji: None,
                    })
                    .collect();
                self.categories = categories;
                info!(count = self.categories.len(), "loaded categories");
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch categories; starting with an empty list");
                self.categories.clear();
            }
        }
        self.categories.len()
    }

    pub async fn create(&mut self, draft: TaskDraft) -> StoreResult<Task> {
        let name = draft.name.trim().to_string();
        let description = draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        validate_task_fields(&name, description.as_deref())?;

        let payload = TaskPayload {
            name,
            description: description.unwrap_or_default(),
            completed: false,
            categories: category_refs(&draft.categories),
            date: Local::now().date_naive(),
            deadline: draft.deadline,
        };

        let record = self.client.create_task(&payload).await.inspect_err(|err| {
            warn!(error = %err, "failed to create task");
        })?;

        let mut task = self.task_from_record(record);
        task.color = draft
            .color
            .unwrap_or_else(|| self.options.default_task_color.clone());
        task.emoji = draft.emoji;
        if task.categories.is_empty() {
            task.categories = draft.categories;
        }

        info!(task_id = %task.id, "created task");
        self.upsert(task.clone());
        Ok(task)
    }

    pub async fn update(&mut self, id: Uuid, patch: TaskPatch) -> StoreResult<Task> {
        let index = self.index_of(id).ok_or(StoreError::TaskNotFound(id))?;

        let mut candidate = self.tasks[index].clone();
        patch.apply_to(&mut candidate);
        candidate.name = candidate.name.trim().to_string();
        candidate.description = candidate
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        validate_task_fields(&candidate.name, candidate.description.as_deref())?;

        self.commit_remote(index, candidate).await
    }

    /// Flips completion; the remote receives the new value so both sides
    /// agree after repeated toggles.
    pub async fn toggle_done(&mut self, id: Uuid) -> StoreResult<Task> {
        let index = self.index_of(id).ok_or(StoreError::TaskNotFound(id))?;

        let mut candidate = self.tasks[index].clone();
        candidate.done = !candidate.done;

        self.commit_remote(index, candidate).await
    }

    /// Pinned is client-only state and never reaches the server.
    pub fn toggle_pinned(&mut self, id: Uuid) -> StoreResult<bool> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(StoreError::TaskNotFound(id))?;
        task.pinned = !task.pinned;
        Ok(task.pinned)
    }

    pub async fn remove(&mut self, id: Uuid) -> StoreResult<()> {
        self.client.delete_task(id).await.inspect_err(|err| {
            warn!(task_id = %id, error = %err, "failed to delete task");
        })?;

        self.tasks.retain(|task| task.id != id);
        info!(task_id = %id, "deleted task");
        Ok(())
    }

    /// Deletes every id concurrently and commits once all requests settled.
    /// Only ids the server confirmed are dropped locally.
    pub async fn remove_many(&mut self, ids: &[Uuid]) -> BulkOutcome {
        let handles: Vec<_> = unique_ids(ids)
            .into_iter()
            .map(|id| {
                let client = Arc::clone(&self.client);
                (id, tokio::spawn(async move { client.delete_task(id).await }))
            })
            .collect();

        let mut outcome = BulkOutcome::default();
        for (id, handle) in handles {
            match join_remote(handle).await {
                Ok(()) => outcome.succeeded.push(id),
                Err(err) => {
                    warn!(task_id = %id, error = %err, "bulk delete failed for task");
                    outcome.failed.push((id, err.into()));
                }
            }
        }

        let removed: HashSet<Uuid> = outcome.succeeded.iter().copied().collect();
        self.tasks.retain(|task| !removed.contains(&task.id));
        info!(
            removed = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk delete settled"
        );
        outcome
    }

    /// Marks every listed task done with one concurrent update per task.
    pub async fn mark_many_done(&mut self, ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        let mut handles = Vec::new();

        for id in unique_ids(ids) {
            let Some(task) = self.task(id) else {
                outcome.failed.push((id, StoreError::TaskNotFound(id)));
                continue;
            };
            if task.done {
                outcome.succeeded.push(id);
                continue;
            }

            let mut payload = TaskPayload::from_task(task);
            payload.completed = true;
            let client = Arc::clone(&self.client);
            handles.push((
                id,
                tokio::spawn(async move { client.update_task(id, &payload).await }),
            ));
        }

        let mut confirmed = HashSet::new();
        for (id, handle) in handles {
            match join_remote(handle).await {
                Ok(_) => {
                    confirmed.insert(id);
                    outcome.succeeded.push(id);
                }
                Err(err) => {
                    warn!(task_id = %id, error = %err, "bulk completion failed for task");
                    outcome.failed.push((id, err.into()));
                }
            }
        }

        let now = Utc::now();
        for task in self
            .tasks
            .iter_mut()
            .filter(|task| confirmed.contains(&task.id))
        {
            task.done = true;
            task.last_save = Some(now);
        }
        info!(
            completed = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk completion settled"
        );
        outcome
    }

    pub async fn create_category(&mut self, draft: CategoryDraft) -> StoreResult<Category> {
        let name = draft.name.trim().to_string();
        validate_category_name(&name)?;

        let record = self
            .client
            .create_category(&CategoryPayload { name })
            .await
            .inspect_err(|err| warn!(error = %err, "failed to create category"))?;

        let category = Category {
            color: draft
                .color
                .unwrap_or_else(|| self.palette_color(self.categories.len())),
            id: record.id,
            name: record.name,
            emoji: draft.emoji,
        };

        self.categories.retain(|existing| existing.id != category.id);
        self.categories.push(category.clone());
        info!(category_id = %category.id, "created category");
        Ok(category)
    }

    pub async fn rename_category(
        &mut self,
        id: &CategoryId,
        draft: CategoryDraft,
    ) -> StoreResult<Category> {
        let index = self
            .categories
            .iter()
            .position(|category| &category.id == id)
            .ok_or_else(|| StoreError::category_not_found(id))?;
        let name = draft.name.trim().to_string();
        validate_category_name(&name)?;

        let record = self
            .client
            .update_category(id, &CategoryPayload { name })
            .await
            .inspect_err(|err| {
                warn!(category_id = %id, error = %err, "failed to rename category");
            })?;

        let category = &mut self.categories[index];
        category.name = record.name;
        if let Some(emoji) = draft.emoji {
            category.emoji = Some(emoji);
        }
        if let Some(color) = draft.color {
            category.color = color;
        }
        let category = category.clone();

        for tagged in self
            .tasks
            .iter_mut()
            .flat_map(|task| task.categories.iter_mut())
            .filter(|tagged| &tagged.id == id)
        {
            *tagged = category.clone();
        }

        info!(category_id = %id, "renamed category");
        Ok(category)
    }

    /// Tasks keep their reference to a removed category; nothing cascades.
    pub async fn remove_category(&mut self, id: &CategoryId) -> StoreResult<()> {
        self.client
            .delete_category(id)
            .await
            .inspect_err(|err| {
                warn!(category_id = %id, error = %err, "failed to delete category");
            })?;

        self.categories.retain(|category| &category.id != id);
        info!(category_id = %id, "deleted category");
        Ok(())
    }

    /// Accepts a full UUID or a unique prefix of one.
    pub fn resolve_task_id(&self, selector: &str) -> StoreResult<Uuid> {
        let trimmed = selector.trim();
        if let Ok(parsed) = Uuid::parse_str(trimmed) {
            return self
                .task(parsed)
                .map(|task| task.id)
                .ok_or(StoreError::TaskNotFound(parsed));
        }

        let needle = trimmed.to_ascii_lowercase();
        if needle.is_empty() {
            return Err(StoreError::UnknownTask(selector.to_string()));
        }

        let matches: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|task| {
                task.id.to_string().starts_with(&needle)
                    || task.id.as_simple().to_string().starts_with(&needle)
            })
            .map(|task| task.id)
            .collect();

        match matches.as_slice() {
            [single] => Ok(*single),
            [] => Err(StoreError::UnknownTask(selector.to_string())),
            many => Err(StoreError::AmbiguousTask {
                selector: selector.to_string(),
                count: many.len(),
            }),
        }
    }

    /// Matches a category by id first, then by case-insensitive name.
    pub fn resolve_category(&self, selector: &str) -> StoreResult<&Category> {
        let trimmed = selector.trim();
        self.categories
            .iter()
            .find(|category| category.id.as_str() == trimmed)
            .or_else(|| {
                self.categories
                    .iter()
                    .find(|category| category.name.eq_ignore_ascii_case(trimmed))
            })
            .ok_or_else(|| StoreError::CategoryNotFound(selector.to_string()))
    }

    async fn commit_remote(&mut self, index: usize, mut candidate: Task) -> StoreResult<Task> {
        let id = candidate.id;
        let payload = TaskPayload::from_task(&candidate);

        let record = self
            .client
            .update_task(id, &payload)
            .await
            .inspect_err(|err| warn!(task_id = %id, error = %err, "failed to update task"))?;

        candidate.last_save = Some(Utc::now());
        if record.updated_at.is_some() {
            candidate.updated_at = record.updated_at;
        }

        self.tasks[index] = candidate.clone();
        info!(task_id = %id, "updated task");
        Ok(candidate)
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn upsert(&mut self, task: Task) {
        match self.index_of(task.id) {
            Some(index) => self.tasks[index] = task,
            None => self.tasks.push(task),
        }
    }

    fn task_from_record(&self, record: TaskRecord) -> Task {
        let categories = record
            .categories
            .into_iter()
            .map(|category| self.category_from_record(category))
            .collect();

        Task {
            id: record.id,
            name: record.name,
            description: record.description.filter(|value| !value.is_empty()),
            done: record.completed,
            pinned: false,
            color: self.options.default_task_color.clone(),
            emoji: None,
            date: record.date,
            deadline: record.deadline,
            categories,
            last_save: None,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn category_from_record(&self, record: CategoryRecord) -> Category {
        match self.category(&record.id) {
            Some(known) => Category {
                name: record.name,
                ..known.clone()
            },
            None => Category {
                color: self.palette_color(self.categories.len()),
                id: record.id,
                name: record.name,
                emoji: None,
            },
        }
    }

    fn palette_color(&self, index: usize) -> String {
        if self.options.palette.is_empty() {
            return self.options.default_task_color.clone();
        }
        self.options.palette[index % self.options.palette.len()].clone()
    }
}

fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

async fn join_remote<T>(
    handle: tokio::task::JoinHandle<Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    match handle.await {
        Ok(result) => result,
        Err(err) => Err(RemoteError::Transport {
            path: "tasks/".to_string(),
            message: format!("request task did not complete: {err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::api::RemoteResult;

    #[derive(Default)]
    struct ScriptedApi {
        records: Vec<TaskRecord>,
        fail_writes: bool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls mutex").clone()
        }

        fn record(&self, call: String) -> RemoteResult<()> {
            self.calls.lock().expect("calls mutex").push(call);
            if self.fail_writes {
                return Err(RemoteError::Status {
                    path: "tasks/".to_string(),
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(())
        }
    }

    fn echo(id: Uuid, payload: &TaskPayload) -> TaskRecord {
        TaskRecord {
            id,
            name: payload.name.clone(),
            description: Some(payload.description.clone()),
            completed: payload.completed,
            categories: Vec::new(),
            date: payload.date,
            deadline: payload.deadline,
            created_at: None,
            updated_at: None,
        }
    }

    #[async_trait]
    impl TaskApi for ScriptedApi {
        async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>> {
            Ok(self.records.clone())
        }

        async fn create_task(&self, payload: &TaskPayload) -> RemoteResult<TaskRecord> {
            self.record(format!("create {}", payload.name))?;
            Ok(echo(Uuid::from_u128(99), payload))
        }

        async fn update_task(&self, id: Uuid, payload: &TaskPayload) -> RemoteResult<TaskRecord> {
            self.record(format!("update {id} completed={}", payload.completed))?;
            Ok(echo(id, payload))
        }

        async fn delete_task(&self, id: Uuid) -> RemoteResult<()> {
            self.record(format!("delete {id}"))
        }

        async fn list_categories(&self) -> RemoteResult<Vec<CategoryRecord>> {
            Ok(Vec::new())
        }

        async fn create_category(&self, payload: &CategoryPayload) -> RemoteResult<CategoryRecord> {
            self.record(format!("create category {}", payload.name))?;
            Ok(CategoryRecord {
                id: CategoryId::new("1"),
                name: payload.name.clone(),
            })
        }

        async fn update_category(
            &self,
            id: &CategoryId,
            payload: &CategoryPayload,
        ) -> RemoteResult<CategoryRecord> {
            self.record(format!("update category {id}"))?;
            Ok(CategoryRecord {
                id: id.clone(),
                name: payload.name.clone(),
            })
        }

        async fn delete_category(&self, id: &CategoryId) -> RemoteResult<()> {
            self.record(format!("delete category {id}"))
        }
    }

    fn record(id: u128, name: &str, completed: bool) -> TaskRecord {
        TaskRecord {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            description: Some(String::new()),
            completed,
            categories: vec![CategoryRecord {
                id: CategoryId::new("1"),
                name: "Home".to_string(),
            }],
            date: NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid date"),
            deadline: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn options() -> StoreOptions {
        StoreOptions {
            palette: vec!["#FF69B4".to_string(), "#C6A7FF".to_string()],
            default_task_color: DEFAULT_TASK_COLOR.to_string(),
        }
    }

    #[tokio::test]
    async fn load_maps_wire_records_to_local_defaults() {
        let api = ScriptedApi {
            records: vec![record(1, "A", true), record(1, "duplicate", false)],
            ..ScriptedApi::default()
        };
        let mut store = TaskStore::new(api, options());

        assert_eq!(store.load().await, 1);
        let task = &store.tasks()[0];
        assert!(task.done);
        assert!(!task.pinned);
        assert_eq!(task.color, DEFAULT_TASK_COLOR);
        assert!(task.description.is_none());
        assert_eq!(task.categories[0].color, "#FF69B4");
    }

    #[tokio::test]
    async fn create_rejects_invalid_names_without_calling_remote() {
        let mut store = TaskStore::new(ScriptedApi::default(), options());

        let err = store
            .create(TaskDraft {
                name: "  ".to_string(),
                ..TaskDraft::default()
            })
            .await
            .expect_err("blank name should fail");

        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyName)
        ));
        assert!(store.client().calls().is_empty());
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn create_keeps_local_only_fields_from_draft() {
        let mut store = TaskStore::new(ScriptedApi::default(), options());

        let task = store
            .create(TaskDraft {
                name: "Water plants".to_string(),
                color: Some("#3DFF7F".to_string()),
                emoji: Some("1f331".to_string()),
                ..TaskDraft::default()
            })
            .await
            .expect("create should succeed");

        assert_eq!(task.id, Uuid::from_u128(99));
        assert_eq!(task.color, "#3DFF7F");
        assert_eq!(task.emoji.as_deref(), Some("1f331"));
        assert_eq!(store.tasks().len(), 1);
    }

    #[tokio::test]
    async fn update_failure_leaves_collection_untouched() {
        let api = ScriptedApi {
            records: vec![record(1, "A", false)],
            fail_writes: true,
            ..ScriptedApi::default()
        };
        let mut store = TaskStore::new(api, options());
        store.load().await;
        let before = store.tasks().to_vec();

        let result = store
            .update(
                Uuid::from_u128(1),
                TaskPatch {
                    name: Some("Renamed".to_string()),
                    ..TaskPatch::default()
                },
            )
            .await;

        assert!(matches!(result, Err(StoreError::Remote(_))));
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(store.client().calls().len(), 1);
    }

    #[tokio::test]
    async fn update_unknown_task_skips_remote() {
        let mut store = TaskStore::new(ScriptedApi::default(), options());
        let result = store.update(Uuid::from_u128(5), TaskPatch::default()).await;

        assert!(matches!(result, Err(StoreError::TaskNotFound(_))));
        assert!(store.client().calls().is_empty());
    }

    #[tokio::test]
    async fn toggle_done_sends_the_new_value() {
        let api = ScriptedApi {
            records: vec![record(1, "A", false)],
            ..ScriptedApi::default()
        };
        let mut store = TaskStore::new(api, options());
        store.load().await;
        let id = Uuid::from_u128(1);

        assert!(store.toggle_done(id).await.expect("toggle").done);
        assert!(!store.toggle_done(id).await.expect("toggle").done);

        let calls = store.client().calls();
        assert_eq!(calls[0], format!("update {id} completed=true"));
        assert_eq!(calls[1], format!("update {id} completed=false"));
        assert!(store.task(id).expect("task").last_save.is_some());
    }

    #[tokio::test]
    async fn toggle_pinned_is_local_only() {
        let api = ScriptedApi {
            records: vec![record(1, "A", false)],
            ..ScriptedApi::default()
        };
        let mut store = TaskStore::new(api, options());
        store.load().await;

        assert!(store.toggle_pinned(Uuid::from_u128(1)).expect("pin"));
        assert!(store.client().calls().is_empty());
    }

    #[tokio::test]
    async fn resolve_task_id_accepts_unique_prefix() {
        let api = ScriptedApi {
            records: vec![
                record(0x1111_0000_0000_0000_0000_0000_0000_0000, "A", false),
                record(0x2222_0000_0000_0000_0000_0000_0000_0000, "B", false),
            ],
            ..ScriptedApi::default()
        };
        let mut store = TaskStore::new(api, options());
        store.load().await;

        let resolved = store.resolve_task_id("1111").expect("prefix should resolve");
        assert_eq!(resolved, Uuid::from_u128(0x1111_0000_0000_0000_0000_0000_0000_0000));
        assert!(matches!(
            store.resolve_task_id("3333"),
            Err(StoreError::UnknownTask(_))
        ));
        assert!(matches!(
            store.resolve_task_id("0000"),
            Err(StoreError::UnknownTask(_))
        ));
    }

    #[tokio::test]
    async fn rename_category_updates_task_references() {
        let api = ScriptedApi {
            records: vec![record(1, "A", false)],
            ..ScriptedApi::default()
        };
        let mut store = TaskStore::new(api, options());
        store.categories.push(Category {
            id: CategoryId::new("1"),
            name: "Home".to_string(),
            emoji: None,
            color: "#1fff44".to_string(),
        });
        store.load().await;

        store
            .rename_category(
                &CategoryId::new("1"),
                CategoryDraft {
                    name: "House".to_string(),
                    ..CategoryDraft::default()
                },
            )
            .await
            .expect("rename should succeed");

        assert_eq!(store.categories()[0].name, "House");
        assert_eq!(store.tasks()[0].categories[0].name, "House");
        assert_eq!(store.tasks()[0].categories[0].color, "#1fff44");
    }
}
