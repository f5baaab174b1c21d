//! In-memory service used by unit tests above the store.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{RemoteError, RemoteResult, TaskApi};
use crate::types::{CategoryId, CategoryPayload, CategoryRecord, TaskPayload, TaskRecord};

#[derive(Default)]
pub(crate) struct MemoryApi {
    tasks: Mutex<Vec<TaskRecord>>,
    categories: Mutex<Vec<CategoryRecord>>,
    failing: Mutex<HashSet<Uuid>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryApi {
    pub(crate) fn with_tasks(tasks: Vec<TaskRecord>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    pub(crate) fn with_categories(self, categories: Vec<CategoryRecord>) -> Self {
        *self.categories.lock().expect("categories mutex") = categories;
        self
    }

    /// Writes touching `id` answer with HTTP 500.
    pub(crate) fn fail_on(&self, id: Uuid) {
        self.failing.lock().expect("failing mutex").insert(id);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub(crate) fn remote_tasks(&self) -> Vec<TaskRecord> {
        self.tasks.lock().expect("tasks mutex").clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().expect("calls mutex").push(call);
    }

    fn check(&self, id: Uuid, path: String) -> RemoteResult<()> {
        if self.failing.lock().expect("failing mutex").contains(&id) {
            return Err(RemoteError::Status {
                path,
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(())
    }

    fn missing(path: String) -> RemoteError {
        RemoteError::Status {
            path,
            status: 404,
            body: String::new(),
        }
    }
}

pub(crate) fn record_from_payload(id: Uuid, payload: &TaskPayload) -> TaskRecord {
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
impl TaskApi for MemoryApi {
    async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>> {
        self.log("GET tasks/".to_string());
        Ok(self.remote_tasks())
    }

    async fn create_task(&self, payload: &TaskPayload) -> RemoteResult<TaskRecord> {
        self.log("POST tasks/".to_string());
        let record = record_from_payload(Uuid::new_v4(), payload);
        self.tasks.lock().expect("tasks mutex").push(record.clone());
        Ok(record)
    }

    async fn update_task(&self, id: Uuid, payload: &TaskPayload) -> RemoteResult<TaskRecord> {
        let path = format!("tasks/{id}/");
        self.log(format!("PUT {path}"));
        self.check(id, path.clone())?;

        let mut tasks = self.tasks.lock().expect("tasks mutex");
        let slot = tasks
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Self::missing(path))?;
        *slot = record_from_payload(id, payload);
        Ok(slot.clone())
    }

    async fn delete_task(&self, id: Uuid) -> RemoteResult<()> {
        let path = format!("tasks/{id}/");
        self.log(format!("DELETE {path}"));
        self.check(id, path.clone())?;

        let mut tasks = self.tasks.lock().expect("tasks mutex");
        let before = tasks.len();
        tasks.retain(|record| record.id != id);
        if tasks.len() == before {
            return Err(Self::missing(path));
        }
        Ok(())
    }

    async fn list_categories(&self) -> RemoteResult<Vec<CategoryRecord>> {
        self.log("GET categories/".to_string());
        Ok(self.categories.lock().expect("categories mutex").clone())
    }

    async fn create_category(&self, payload: &CategoryPayload) -> RemoteResult<CategoryRecord> {
        self.log("POST categories/".to_string());
        let mut categories = self.categories.lock().expect("categories mutex");
        let record = CategoryRecord {
            id: CategoryId::new((categories.len() + 1).to_string()),
            name: payload.name.clone(),
        };
        categories.push(record.clone());
        Ok(record)
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        payload: &CategoryPayload,
    ) -> RemoteResult<CategoryRecord> {
        let path = format!("categories/{id}/");
        self.log(format!("PUT {path}"));
        let mut categories = self.categories.lock().expect("categories mutex");
        let slot = categories
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| Self::missing(path))?;
        slot.name = payload.name.clone();
        Ok(slot.clone())
    }

    async fn delete_category(&self, id: &CategoryId) -> RemoteResult<()> {
        let path = format!("categories/{id}/");
        self.log(format!("DELETE {path}"));
        let mut categories = self.categories.lock().expect("categories mutex");
        let before = categories.len();
        categories.retain(|record| &record.id != id);
        if categories.len() == before {
            return Err(Self::missing(path));
        }
        Ok(())
    }
}
