//! PS256 token minting with a per-identity cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheLoader, CachePolicy, CoalescingCache};
use crate::error::AuthError;
use crate::principal::Identity;

/// Token lifetime. Fixed: every minted token expires 5 minutes after issue.
pub const TOKEN_TTL: Duration = Duration::from_secs(300);

/// Tokens are refreshed once they are within this window of expiry.
pub const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(30);

/// Claims carried by every minted token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub principal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Cache key: one token per (audience, principal). The identity's subject
/// and email are functionally determined by the principal, so carrying
/// them in the key does not widen it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub audience: String,
    pub identity: Identity,
}

/// Signs tokens; plugged into the coalescing cache as its loader.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    header: Header,
    issuer: String,
}

impl TokenSigner {
    /// Builds a signer from an RSA private key PEM. The key id, when
    /// known (configured or fetched from JWKS), is stamped into every
    /// token header.
    pub fn from_rsa_pem(
        pem: &str,
        issuer: impl Into<String>,
        key_id: Option<String>,
    ) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        let mut header = Header::new(Algorithm::PS256);
        header.kid = key_id;

        Ok(Self {
            encoding_key,
            header,
            issuer: issuer.into(),
        })
    }

    /// Assembles claims for an identity/audience pair at `now` (seconds
    /// since epoch). Pure; exercised directly by tests.
    pub fn build_claims(&self, identity: &Identity, audience: &str, now: i64) -> Claims {
        Claims {
            sub: identity.subject.clone(),
            principal: identity.principal.clone(),
            email: identity.email.clone(),
            aud: audience.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + TOKEN_TTL.as_secs() as i64,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

#[async_trait]
impl CacheLoader<TokenKey, String> for TokenSigner {
    async fn load(&self, key: &TokenKey) -> Result<String, AuthError> {
        let claims = self.build_claims(&key.identity, &key.audience, chrono::Utc::now().timestamp());
        self.sign(&claims)
    }
}

/// Per-identity token cache over the signer. Tokens are reused until
/// within [`TOKEN_REFRESH_SKEW`] of expiry, then re-minted in foreground.
pub struct TokenMinter {
    cache: Arc<CoalescingCache<TokenKey, String>>,
}

impl TokenMinter {
    pub fn new(signer: Arc<TokenSigner>) -> Self {
        Self::with_loader(signer)
    }

    /// Builds a minter over any token loader. Tests plug a stub here to
    /// avoid needing real key material.
    pub fn with_loader(loader: Arc<dyn CacheLoader<TokenKey, String>>) -> Self {
        Self {
            cache: CoalescingCache::new(CachePolicy::tokens(), loader),
        }
    }

    /// A bearer token for `identity` against `audience`.
    pub async fn bearer(&self, identity: &Identity, audience: &str) -> Result<String, AuthError> {
        let key = TokenKey {
            audience: audience.to_string(),
            identity: identity.clone(),
        };
        let token = self.cache.get(&key).await?;
        Ok(format!("Bearer {token}"))
    }
}

#[derive(Deserialize)]
struct JwksDocument {
    keys: Vec<JwksKey>,
}

#[derive(Deserialize)]
struct JwksKey {
    kid: Option<String>,
}

/// Fetches the signing key id from a JWKS endpoint. Called once during
/// bootstrap when no key id is configured.
pub async fn fetch_jwks_kid(http: &reqwest::Client, url: &str) -> Result<String, AuthError> {
    let jwks = http
        .get(url)
        .send()
        .await
        .map_err(|e| AuthError::Jwks {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .json::<JwksDocument>()
        .await
        .map_err(|e| AuthError::Jwks {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    jwks.keys
        .into_iter()
        .find_map(|key| key.kid)
        .ok_or_else(|| AuthError::Jwks {
            url: url.to_string(),
            reason: "no key with a kid".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Claim assembly is pure and tested without key material; signing is
    // exercised against a real key in deployment and the config tests
    // cover PEM resolution.
    fn signer() -> TokenSigner {
        TokenSigner {
            encoding_key: EncodingKey::from_secret(b"unused"),
            header: Header::new(Algorithm::PS256),
            issuer: "https://auth.example/".to_string(),
        }
    }

    #[test]
    fn claims_have_fixed_ttl_and_issuer() {
        let identity = Identity::service_fallback("lfx-sync");
        let claims = signer().build_claims(&identity, "https://projects.example/", 1_700_000_000);

        assert_eq!(claims.exp - claims.iat, 300);
        assert_eq!(claims.iss, "https://auth.example/");
        assert_eq!(claims.aud, "https://projects.example/");
        assert_eq!(claims.sub, "lfx-sync");
        assert_eq!(claims.principal, "lfx-sync@clients");
    }

    #[test]
    fn email_claim_omitted_when_absent() {
        let identity = Identity::machine("replicator@clients");
        let claims = signer().build_claims(&identity, "aud", 0);
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.as_object().unwrap().get("email").is_none());
    }

    #[test]
    fn email_claim_present_for_users() {
        let identity = Identity::user("jdoe", Some("jdoe@example.org".to_string()));
        let claims = signer().build_claims(&identity, "aud", 0);
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["email"], "jdoe@example.org");
    }

    #[test]
    fn token_policy_refreshes_ahead_of_expiry() {
        let policy = CachePolicy::tokens();
        assert_eq!(policy.fresh_for, TOKEN_TTL - TOKEN_REFRESH_SKEW);
        assert_eq!(policy.fresh_for, policy.usable_for);
    }

    #[test]
    fn jwks_document_takes_first_kid() {
        let doc: JwksDocument =
            serde_json::from_str(r#"{"keys":[{"kid":null},{"kid":"k1"},{"kid":"k2"}]}"#).unwrap();
        let kid = doc.keys.into_iter().find_map(|k| k.kid);
        assert_eq!(kid.as_deref(), Some("k1"));
    }
}
