//! Authentication error types.

use thiserror::Error;

/// Errors raised while minting tokens or resolving identities.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The configured signing key could not be parsed.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The JWKS endpoint could not supply a key id.
    #[error("JWKS fetch from {url} failed: {reason}")]
    Jwks { url: String, reason: String },

    /// The v1 user lookup failed; callers fall back to the service identity.
    #[error("v1 user lookup for {id:?} failed: {reason}")]
    UserLookup { id: String, reason: String },
}
