//! Token minting and identity attribution.
//!
//! Every outbound effect is attributed to the identity that last modified
//! the v1 record. This crate resolves that identity from the record's
//! `last_modified_by` field, mints short-lived PS256 bearer tokens for it,
//! and caches both tokens and user lookups behind a shared coalescing TTL
//! cache so concurrent handlers never stampede the signer or the v1 user
//! service.

mod cache;
mod error;
mod minter;
mod principal;
mod users;

pub use cache::{CacheLoader, CachePolicy, CoalescingCache};
pub use error::AuthError;
pub use minter::{Claims, TOKEN_REFRESH_SKEW, TOKEN_TTL, TokenKey, TokenMinter, TokenSigner, fetch_jwks_kid};
pub use principal::{Identity, MACHINE_SUFFIX, PrincipalResolver};
pub use users::{UserDirectory, UserLookupClient, UserRecord, user_cache};
