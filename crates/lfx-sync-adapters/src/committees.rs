//! v2 committee service client: committees and their members.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::AdapterError;
use crate::rest::{Created, Fetched, ensure_success, etag_of, transport_error, uid_of};

/// Committee and member operations the sync engine needs.
#[async_trait]
pub trait CommitteeApi: Send + Sync {
    async fn create_committee(&self, token: &str, body: &Value) -> Result<Created, AdapterError>;
    async fn get_committee(&self, token: &str, uid: &str) -> Result<Fetched, AdapterError>;
    async fn update_committee(
        &self,
        token: &str,
        uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError>;
    async fn delete_committee(
        &self,
        token: &str,
        uid: &str,
        etag: Option<&str>,
    ) -> Result<(), AdapterError>;

    async fn create_member(
        &self,
        token: &str,
        committee_uid: &str,
        body: &Value,
    ) -> Result<Created, AdapterError>;
    async fn get_member(
        &self,
        token: &str,
        committee_uid: &str,
        member_uid: &str,
    ) -> Result<Fetched, AdapterError>;
    async fn update_member(
        &self,
        token: &str,
        committee_uid: &str,
        member_uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError>;
    async fn delete_member(
        &self,
        token: &str,
        committee_uid: &str,
        member_uid: &str,
        etag: Option<&str>,
    ) -> Result<(), AdapterError>;
}

/// REST implementation against the configured base URL.
pub struct CommitteeServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl CommitteeServiceClient {
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

    async fn create_at(&self, token: &str, path: &str, body: &Value) -> Result<Created, AdapterError> {
        let response = self
            .http
            .post(self.url(path))
            .header(reqwest::header::AUTHORIZATION, token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response).await?;

        let etag = etag_of(&response);
        let body: Value = response.json().await.map_err(transport_error)?;
        let uid = uid_of(&body)?;
        debug!(uid, path, "committee-service entity created");
        Ok(Created { uid, etag })
    }

    async fn get_at(&self, token: &str, path: &str) -> Result<Fetched, AdapterError> {
        let response = self
            .http
            .get(self.url(path))
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

    async fn update_at(
        &self,
        token: &str,
        path: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        let response = self
            .http
            .put(self.url(path))
            .header(reqwest::header::AUTHORIZATION, token)
            .header(reqwest::header::IF_MATCH, etag)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await.map(|_| ())
    }

    async fn delete_at(
        &self,
        token: &str,
        path: &str,
        etag: Option<&str>,
    ) -> Result<(), AdapterError> {
        let mut request = self
            .http
            .delete(self.url(path))
            .header(reqwest::header::AUTHORIZATION, token);
        if let Some(etag) = etag {
            request = request.header(reqwest::header::IF_MATCH, etag);
        }
        let response = request.send().await.map_err(transport_error)?;
        ensure_success(response).await.map(|_| ())
    }
}

#[async_trait]
impl CommitteeApi for CommitteeServiceClient {
    async fn create_committee(&self, token: &str, body: &Value) -> Result<Created, AdapterError> {
        self.create_at(token, "/committees", body).await
    }

    async fn get_committee(&self, token: &str, uid: &str) -> Result<Fetched, AdapterError> {
        self.get_at(token, &format!("/committees/{uid}")).await
    }

    async fn update_committee(
        &self,
        token: &str,
        uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        self.update_at(token, &format!("/committees/{uid}"), etag, body)
            .await
    }

    async fn delete_committee(
        &self,
        token: &str,
        uid: &str,
        etag: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.delete_at(token, &format!("/committees/{uid}"), etag)
            .await
    }

    async fn create_member(
        &self,
        token: &str,
        committee_uid: &str,
        body: &Value,
    ) -> Result<Created, AdapterError> {
        self.create_at(token, &format!("/committees/{committee_uid}/members"), body)
            .await
    }

    async fn get_member(
        &self,
        token: &str,
        committee_uid: &str,
        member_uid: &str,
    ) -> Result<Fetched, AdapterError> {
        self.get_at(token, &format!("/committees/{committee_uid}/members/{member_uid}"))
            .await
    }

    async fn update_member(
        &self,
        token: &str,
        committee_uid: &str,
        member_uid: &str,
        etag: &str,
        body: &Value,
    ) -> Result<(), AdapterError> {
        self.update_at(
            token,
            &format!("/committees/{committee_uid}/members/{member_uid}"),
            etag,
            body,
        )
        .await
    }

    async fn delete_member(
        &self,
        token: &str,
        committee_uid: &str,
        member_uid: &str,
        etag: Option<&str>,
    ) -> Result<(), AdapterError> {
        self.delete_at(
            token,
            &format!("/committees/{committee_uid}/members/{member_uid}"),
            etag,
        )
        .await
    }
}
