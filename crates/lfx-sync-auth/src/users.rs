//! v1 user lookup.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cache::{CacheLoader, CachePolicy, CoalescingCache};
use crate::error::AuthError;

/// A v1 platform user, as returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The process-global user cache: platform id → user record.
pub type UserDirectory = CoalescingCache<String, UserRecord>;

/// Builds the user directory over a lookup client.
pub fn user_cache(loader: Arc<dyn CacheLoader<String, UserRecord>>) -> Arc<UserDirectory> {
    CoalescingCache::new(CachePolicy::users(), loader)
}

/// REST client for the v1 user service.
pub struct UserLookupClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl UserLookupClient {
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
impl CacheLoader<String, UserRecord> for UserLookupClient {
    async fn load(&self, id: &String) -> Result<UserRecord, AuthError> {
        let url = format!("{}/users/{id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| AuthError::UserLookup {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::UserLookup {
                id: id.clone(),
                reason: format!("status {status}"),
            });
        }

        response
            .json::<UserRecord>()
            .await
            .map_err(|e| AuthError::UserLookup {
                id: id.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_record_tolerates_missing_email() {
        let user: UserRecord = serde_json::from_str(r#"{"username":"jdoe"}"#).unwrap();
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.email, None);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = UserLookupClient::new(
            reqwest::Client::new(),
            "https://v1.example/",
            "svc",
            "secret",
        );
        assert_eq!(client.base_url, "https://v1.example");
    }
}
