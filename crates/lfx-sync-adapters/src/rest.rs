//! Shared REST plumbing: client construction, outcome classification,
//! response shapes.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::error::AdapterError;

/// Result of a create call: the assigned v2 id plus the entity tag when
/// the service returns one on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub uid: String,
    pub etag: Option<String>,
}

/// Result of a get call: current state plus the entity tag required for
/// the following update.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub body: Value,
    pub etag: String,
}

/// Builds the shared HTTP client. Every request carries the service name
/// in `user-agent` for downstream observability.
pub fn http_client(service_name: &str, timeout: Duration) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .user_agent(service_name.to_string())
        .timeout(timeout)
        .build()
        .map_err(|e| AdapterError::Transient(e.to_string()))
}

/// Maps a transport-level failure. reqwest errors at this layer are
/// connection/timeout problems, all retryable.
pub(crate) fn transport_error(error: reqwest::Error) -> AdapterError {
    AdapterError::Transient(error.to_string())
}

/// Classifies an HTTP response, consuming error bodies for the log.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::PRECONDITION_FAILED {
        return Err(AdapterError::PreconditionFailed);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_client_error() {
        Err(AdapterError::Logical {
            status: status.as_u16(),
            body,
        })
    } else {
        Err(AdapterError::Transient(format!("status {status}: {body}")))
    }
}

/// Extracts the entity tag header.
pub(crate) fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Decodes a created/fetched body and pulls out the `uid` field.
pub(crate) fn uid_of(body: &Value) -> Result<String, AdapterError> {
    body.get("uid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AdapterError::Decode("response body has no uid".to_string()))
}
