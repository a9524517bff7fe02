//! API-key authentication for the protected routes.

use super::ApiError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

const API_KEY_HEADER: &str = "x-api-key";

/// Configured API key, held as a SHA-256 digest.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    digest: Vec<u8>,
}

impl ApiKey {
    /// Creates a key from its secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).to_vec(),
        }
    }

    /// Compares `candidate` with the key in constant time over digests.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate_digest = Sha256::digest(candidate.as_bytes());
        self.digest.len() == candidate_digest.len()
            && self
                .digest
                .iter()
                .zip(candidate_digest.iter())
                .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
                == 0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("ApiKey(<redacted>)")
    }
}

/// Reads a bearer token or `X-API-Key` header.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .or_else(|| {
            headers
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
        })
}

/// Rejects requests without the configured key. Passes everything through
/// when no key is configured.
pub async fn require_api_key(
    State(expected): State<Option<ApiKey>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(key) = expected else {
        return next.run(request).await;
    };
    if presented_key(request.headers()).is_some_and(|candidate| key.matches(candidate.trim())) {
        return next.run(request).await;
    }
    warn!(path = %request.uri().path(), "request rejected: missing or invalid API key");
    ApiError::Unauthorized.into_response()
}
