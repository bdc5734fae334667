//! Principal resolution from v1 record attribution.
//!
//! The `last_modified_by` field on a v1 record determines the identity a
//! minted token is attributed to:
//! - a value ending in `@clients` is a machine identity and passes through
//!   verbatim (the suffix check is textual; no issuer validation),
//! - a value shaped like a platform user id goes through the v1 user
//!   lookup,
//! - anything else, and any lookup failure, falls back to the service's
//!   own identity.

use std::sync::Arc;

use tracing::warn;

use crate::users::UserDirectory;

/// The literal suffix marking machine identities.
pub const MACHINE_SUFFIX: &str = "@clients";

/// A resolved identity: the principal a token is minted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub principal: String,
    pub subject: String,
    pub email: Option<String>,
}

impl Identity {
    /// Machine identity: principal verbatim, subject without the suffix.
    pub fn machine(value: &str) -> Self {
        Self {
            principal: value.to_string(),
            subject: value
                .strip_suffix(MACHINE_SUFFIX)
                .unwrap_or(value)
                .to_string(),
            email: None,
        }
    }

    /// The worker's own identity, used when attribution is impossible.
    pub fn service_fallback(service_name: &str) -> Self {
        Self {
            principal: format!("{service_name}{MACHINE_SUFFIX}"),
            subject: service_name.to_string(),
            email: None,
        }
    }

    /// A looked-up platform user.
    pub fn user(username: &str, email: Option<String>) -> Self {
        Self {
            principal: username.to_string(),
            subject: username.to_string(),
            email,
        }
    }
}

/// Resolves identities, consulting the user directory for platform ids.
pub struct PrincipalResolver {
    users: Arc<UserDirectory>,
    service_name: String,
}

impl PrincipalResolver {
    pub fn new(users: Arc<UserDirectory>, service_name: impl Into<String>) -> Self {
        Self {
            users,
            service_name: service_name.into(),
        }
    }

    /// Resolves the identity for a record's `last_modified_by` value.
    /// Never fails: lookup errors degrade to the service fallback.
    pub async fn resolve(&self, last_modified_by: Option<&str>) -> Identity {
        let value = match last_modified_by.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => return Identity::service_fallback(&self.service_name),
        };

        if value.ends_with(MACHINE_SUFFIX) {
            return Identity::machine(value);
        }

        if !looks_like_platform_id(value) {
            return Identity::service_fallback(&self.service_name);
        }

        match self.users.get(&value.to_string()).await {
            Ok(user) => Identity::user(&user.username, user.email),
            Err(error) => {
                warn!(%error, id = value, "user lookup failed, using service identity");
                Identity::service_fallback(&self.service_name)
            }
        }
    }
}

/// A platform user id is a bare token: no `@`, no whitespace.
fn looks_like_platform_id(value: &str) -> bool {
    !value.contains('@') && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLoader, CachePolicy, CoalescingCache};
    use crate::error::AuthError;
    use crate::users::UserRecord;
    use async_trait::async_trait;

    struct StubUsers;

    #[async_trait]
    impl CacheLoader<String, UserRecord> for StubUsers {
        async fn load(&self, id: &String) -> Result<UserRecord, AuthError> {
            if id == "00u123" {
                Ok(UserRecord {
                    username: "jdoe".to_string(),
                    email: Some("jdoe@example.org".to_string()),
                })
            } else {
                Err(AuthError::UserLookup {
                    id: id.clone(),
                    reason: "not found".to_string(),
                })
            }
        }
    }

    fn resolver() -> PrincipalResolver {
        let users = CoalescingCache::new(CachePolicy::users(), Arc::new(StubUsers));
        PrincipalResolver::new(users, "lfx-sync")
    }

    #[tokio::test]
    async fn machine_identity_passes_through() {
        let identity = resolver().resolve(Some("replicator@clients")).await;
        assert_eq!(identity.principal, "replicator@clients");
        assert_eq!(identity.subject, "replicator");
        assert_eq!(identity.email, None);
    }

    #[tokio::test]
    async fn user_identity_resolves_via_lookup() {
        let identity = resolver().resolve(Some("00u123")).await;
        assert_eq!(identity.principal, "jdoe");
        assert_eq!(identity.subject, "jdoe");
        assert_eq!(identity.email.as_deref(), Some("jdoe@example.org"));
    }

    #[tokio::test]
    async fn failed_lookup_falls_back_to_service() {
        let identity = resolver().resolve(Some("00u999")).await;
        assert_eq!(identity.principal, "lfx-sync@clients");
        assert_eq!(identity.subject, "lfx-sync");
    }

    #[tokio::test]
    async fn missing_and_empty_fall_back_to_service() {
        assert_eq!(
            resolver().resolve(None).await.principal,
            "lfx-sync@clients"
        );
        assert_eq!(
            resolver().resolve(Some("  ")).await.principal,
            "lfx-sync@clients"
        );
    }

    #[tokio::test]
    async fn mail_address_is_not_a_platform_id() {
        // plain addresses are neither machine identities nor platform ids
        let identity = resolver().resolve(Some("someone@example.org")).await;
        assert_eq!(identity.subject, "lfx-sync");
    }
}
