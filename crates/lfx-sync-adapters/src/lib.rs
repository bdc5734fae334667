//! Adapters between the sync engine and the outside world.
//!
//! Two styles: REST clients for the v2 project and committee services
//! (bearer token in the authorization header, entity tag as an if-match
//! precondition on updates), and a publish adapter serializing envelopes
//! onto kind-specific broker subjects. Outcome classification is uniform:
//! 2xx success, 412 entity-tag conflict, other 4xx logical (no retry),
//! 5xx/network/publish failures retryable.
//!
//! All outbound HTTP carries the service name in `user-agent`.

mod committees;
mod error;
mod orgs;
mod projects;
mod publish;
mod rest;

pub use committees::{CommitteeApi, CommitteeServiceClient};
pub use error::AdapterError;
pub use orgs::{OrgDirectory, V1OrgClient};
pub use projects::{ProjectApi, ProjectServiceClient};
pub use publish::{BrokerPublisher, Publisher};
pub use rest::{Created, Fetched, http_client};
