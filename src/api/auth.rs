//! Shared-secret check for mutating endpoints

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use super::AppContext;
use super::error::ApiError;

/// Compare a presented key with the configured secret
///
/// Both sides are hashed first so the comparison always runs over 32 bytes
/// regardless of input length, then compared without early exit.
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());

    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Reject requests whose `Authorization` header does not carry the API password
pub async fn require_api_key(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(key) if api_key_matches(key, ctx.api_password()) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "Rejected request with wrong API key");
            Err(ApiError::Unauthorized)
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "Rejected request without API key");
            Err(ApiError::Unauthorized)
        }
    }
}
