//! Remote task/category service.
//!
//! [`TaskApi`] is the seam the store talks through; [`HttpTaskClient`] is the
//! reqwest implementation used by the binary.

#[cfg(test)]
pub(crate) mod fake;
mod http;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{CategoryId, CategoryPayload, CategoryRecord, TaskPayload, TaskRecord};

pub use http::{ApiConfig, DEFAULT_API_BASE_URL, HttpTaskClient};

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum RemoteError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("server returned HTTP {status} for {path}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response body from {path}: {message}")]
    Decode { path: String, message: String },
}

impl RemoteError {
    pub fn code(&self) -> &'static str {
        match self {
            RemoteError::Transport { .. } => "REMOTE_TRANSPORT",
            RemoteError::Status { status, .. } if *status == 404 => "REMOTE_NOT_FOUND",
            RemoteError::Status { .. } => "REMOTE_HTTP_ERROR",
            RemoteError::Decode { .. } => "REMOTE_DECODE",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>>;

    async fn create_task(&self, payload: &TaskPayload) -> RemoteResult<TaskRecord>;

    async fn update_task(&self, id: Uuid, payload: &TaskPayload) -> RemoteResult<TaskRecord>;

    async fn delete_task(&self, id: Uuid) -> RemoteResult<()>;

    async fn list_categories(&self) -> RemoteResult<Vec<CategoryRecord>>;

    async fn create_category(&self, payload: &CategoryPayload) -> RemoteResult<CategoryRecord>;

    async fn update_category(
        &self,
        id: &CategoryId,
        payload: &CategoryPayload,
    ) -> RemoteResult<CategoryRecord>;

    async fn delete_category(&self, id: &CategoryId) -> RemoteResult<()>;
}
