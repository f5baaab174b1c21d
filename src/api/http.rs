use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{CategoryId, CategoryPayload, CategoryRecord, TaskPayload, TaskRecord};

use super::{RemoteError, RemoteResult, TaskApi};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTaskClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTaskClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let normalized = normalize_base_url(&config.base_url);
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("invalid API base URL '{}'", config.base_url))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RemoteResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| RemoteError::Transport {
                path: path.to_string(),
                message: format!("invalid request path: {err}"),
            })?;
        Ok(self.client.request(method, url))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> RemoteResult<String> {
        debug!(%method, path, "sending request");

        let response = request.send().await.map_err(|err| {
            warn!(%method, path, error = %err, "request failed");
            RemoteError::Transport {
                path: path.to_string(),
                message: err.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            warn!(%method, path, error = %err, "failed to read response body");
            RemoteError::Transport {
                path: path.to_string(),
                message: err.to_string(),
            }
        })?;

        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "server rejected request");
            return Err(RemoteError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(%method, path, status = status.as_u16(), "request succeeded");
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let request = self.request(Method::GET, path)?;
        let body = self.send(Method::GET, path, request).await?;
        decode(path, &body)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, payload: &B) -> RemoteResult<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(method.clone(), path)?.json(payload);
        let body = self.send(method, path, request).await?;
        decode(path, &body)
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        let request = self.request(Method::DELETE, path)?;
        self.send(Method::DELETE, path, request).await.map(|_| ())
    }
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn list_tasks(&self) -> RemoteResult<Vec<TaskRecord>> {
        self.get_json("tasks/").await
    }

    async fn create_task(&self, payload: &TaskPayload) -> RemoteResult<TaskRecord> {
        self.send_json(Method::POST, "tasks/", payload).await
    }

    async fn update_task(&self, id: Uuid, payload: &TaskPayload) -> RemoteResult<TaskRecord> {
        self.send_json(Method::PUT, &task_path(id), payload).await
    }

    async fn delete_task(&self, id: Uuid) -> RemoteResult<()> {
        self.delete(&task_path(id)).await
    }

    async fn list_categories(&self) -> RemoteResult<Vec<CategoryRecord>> {
        self.get_json("categories/").await
    }

    async fn create_category(&self, payload: &CategoryPayload) -> RemoteResult<CategoryRecord> {
        self.send_json(Method::POST, "categories/", payload).await
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        payload: &CategoryPayload,
    ) -> RemoteResult<CategoryRecord> {
        self.send_json(Method::PUT, &category_path(id), payload)
            .await
    }

    async fn delete_category(&self, id: &CategoryId) -> RemoteResult<()> {
        self.delete(&category_path(id)).await
    }
}

fn task_path(id: Uuid) -> String {
    format!("tasks/{id}/")
}

fn category_path(id: &CategoryId) -> String {
    format!("categories/{id}/")
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> RemoteResult<T> {
    serde_json::from_str(body).map_err(|err| {
        warn!(path, error = %err, "failed to decode response body");
        RemoteError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        }
    })
}

/// `Url::join` drops the last segment unless the base ends with a slash.
pub(crate) fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_appends_slash() {
        assert_eq!(
            normalize_base_url("http://localhost:8000/api"),
            "http://localhost:8000/api/"
        );
        assert_eq!(
            normalize_base_url(" http://localhost:8000/api/ "),
            "http://localhost:8000/api/"
        );
    }

    #[test]
    fn client_joins_paths_under_base() {
        let client = HttpTaskClient::new(&ApiConfig {
            base_url: "http://localhost:8000/api".to_string(),
            ..ApiConfig::default()
        })
        .expect("client should build");

        let joined = client
            .base_url()
            .join(&task_path(Uuid::nil()))
            .expect("path should join");
        assert_eq!(
            joined.as_str(),
            "http://localhost:8000/api/tasks/00000000-0000-0000-0000-000000000000/"
        );

        let category = client
            .base_url()
            .join(&category_path(&CategoryId::new("3")))
            .expect("path should join");
        assert_eq!(category.as_str(), "http://localhost:8000/api/categories/3/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = HttpTaskClient::new(&ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        });
        assert!(result.is_err());
    }
}
