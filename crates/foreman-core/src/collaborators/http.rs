//! HTTP response classification shared by the REST collaborators.

use reqwest::{header::HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use super::CollabResult;
use crate::error::{CollaboratorError, PermanentKind};

/// Longest response body excerpt carried in an error message.
const MAX_BODY_EXCERPT: usize = 300;

/// Maps a transport-level failure. Anything that never produced a response
/// is worth retrying.
pub(super) fn transport_error(service: &str, error: reqwest::Error) -> CollaboratorError {
    if error.is_builder() {
        return CollaboratorError::permanent(service, PermanentKind::InvalidRequest, error.to_string());
    }
    CollaboratorError::transient(service, error.to_string())
}

/// Maps a non-success HTTP status to a classified error.
pub(super) fn status_error(
    service: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> CollaboratorError {
    let message = format!("HTTP {}: {}", status.as_u16(), excerpt(body));

    if status == StatusCode::FORBIDDEN && is_rate_limited(headers, body) {
        return CollaboratorError::transient(service, message);
    }

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            CollaboratorError::transient(service, message)
        }
        s if s.is_server_error() => CollaboratorError::transient(service, message),
        StatusCode::UNAUTHORIZED => {
            CollaboratorError::permanent(service, PermanentKind::Authentication, message)
        }
        StatusCode::FORBIDDEN => {
            CollaboratorError::permanent(service, PermanentKind::PermissionDenied, message)
        }
        StatusCode::NOT_FOUND => {
            CollaboratorError::permanent(service, PermanentKind::NotFound, message)
        }
        _ => CollaboratorError::permanent(service, PermanentKind::InvalidRequest, message),
    }
}

fn is_rate_limited(headers: &HeaderMap, body: &str) -> bool {
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted || body.to_ascii_lowercase().contains("rate limit")
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Sends a request and returns the response if its status is a success.
pub(super) async fn send(
    service: &str,
    request: reqwest::RequestBuilder,
) -> CollabResult<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(service, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(service, status, &headers, &body))
}

/// Decodes a JSON body; an unexpected shape is not retryable.
pub(super) async fn json<T: DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> CollabResult<T> {
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(service, e))?;
    serde_json::from_str(&text).map_err(|e| {
        CollaboratorError::permanent(
            service,
            PermanentKind::InvalidRequest,
            format!("unexpected response body: {e}"),
        )
    })
}
