//! v2 project service client.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::AdapterError;
use crate::rest::{Created, Fetched, ensure_success, etag_of, transport_error, uid_of};

/// The project operations the sync engine needs. The engine holds this
/// trait; tests substitute an in-memory fake.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn create(&self, token: &str, body: &Value) -> Result<Created, AdapterError>;
    async fn get(&self, token: &str, uid: &str) -> Result<Fetched, AdapterError>;
    async fn update(
        &self,
        token: &str,
        uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError>;
    async fn delete(&self, token: &str, uid: &str, etag: Option<&str>) -> Result<(), AdapterError>;
}

/// REST implementation against the configured base URL.
pub struct ProjectServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProjectServiceClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ProjectApi for ProjectServiceClient {
    async fn create(&self, token: &str, body: &Value) -> Result<Created, AdapterError> {
        let response = self
            .http
            .post(self.url("/projects"))
            .header(reqwest::header::AUTHORIZATION, token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;

        let etag = etag_of(&response);
        let body: Value = response.json().await.map_err(transport_error)?;
        let uid = uid_of(&body)?;
        debug!(uid, "project created");
        Ok(Created { uid, etag })
    }

    async fn get(&self, token: &str, uid: &str) -> Result<Fetched, AdapterError> {
        let response = self
            .http
            .get(self.url(&format!("/projects/{uid}")))
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;

        let etag = etag_of(&response)
            .ok_or_else(|| AdapterError::Decode("get response carries no etag".to_string()))?;
        let body = response.json().await.map_err(transport_error)?;
        Ok(Fetched { body, etag })
    }

    async fn update(
        &self,
        token: &str,
        uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        let response = self
            .http
            .put(self.url(&format!("/projects/{uid}")))
            .header(reqwest::header::AUTHORIZATION, token)
            .header(reqwest::header::IF_MATCH, etag)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await.map(|_| ())
    }

    async fn delete(&self, token: &str, uid: &str, etag: Option<&str>) -> Result<(), AdapterError> {
        let mut request = self
            .http
            .delete(self.url(&format!("/projects/{uid}")))
            .header(reqwest::header::AUTHORIZATION, token);
        if let Some(etag) = etag {
            request = request.header(reqwest::header::IF_MATCH, etag);
        }
        let response = request.send().await.map_err(transport_error)?;
        ensure_success(response).await.map(|_| ())
    }
}
