//! v1 organization cross-lookup.
//!
//! Mappers enrich member records with the organization's display name.
//! The lookup fails soft: any error leaves the field empty and the record
//! proceeds without it.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Soft-failing organization name lookup.
#[async_trait]
pub trait OrgDirectory: Send + Sync {
    /// The organization's display name, or `None` when the lookup fails
    /// for any reason.
    async fn org_name(&self, org_id: &str) -> Option<String>;
}

#[derive(Deserialize)]
struct OrgRecord {
    name: String,
}

/// REST lookup against the v1 service.
pub struct V1OrgClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl V1OrgClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl OrgDirectory for V1OrgClient {
    async fn org_name(&self, org_id: &str) -> Option<String> {
        let url = format!("{}/orgs/{org_id}", self.base_url);
        let result = async {
            let response = self
                .http
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await?;
            response.error_for_status()?.json::<OrgRecord>().await
        }
        .await;

        match result {
            Ok(org) => Some(org.name),
            Err(error) => {
                warn!(%error, org_id, "org lookup failed, leaving field empty");
                None
            }
        }
    }
}
