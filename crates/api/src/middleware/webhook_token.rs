//! Shared-secret authentication for job-board webhooks.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jobroute_core::error::CoreError;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the shared webhook token.
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Compare two tokens without short-circuiting on the first differing byte.
///
/// Both sides are hashed first so the comparison always covers 32 bytes and
/// leaks nothing about the expected token's length.
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(presented.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Token from the `X-Webhook-Token` header, if present and valid UTF-8.
pub fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(WEBHOOK_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject the request unless `presented` matches the configured token.
pub fn authorize(expected: &str, presented: Option<&str>) -> Result<(), AppError> {
    let Some(presented) = presented else {
        tracing::warn!("Webhook call without a token");
        return Err(CoreError::Unauthorized("Missing webhook token".into()).into());
    };
    if !tokens_match(expected, presented) {
        tracing::warn!("Webhook call with an invalid token");
        return Err(CoreError::Unauthorized("Invalid webhook token".into()).into());
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Caller that presented the webhook token in a header or query string.
///
/// ```ignore
/// async fn active_countries(_caller: WebhookCaller, State(state): State<AppState>) { .. }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WebhookCaller;

impl FromRequestParts<AppState> for WebhookCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.config.webhook_token.as_str();

        if let Some(token) = header_token(&parts.headers) {
            authorize(expected, Some(token))?;
            return Ok(WebhookCaller);
        }

        let query = Query::<TokenQuery>::from_request_parts(parts, state)
            .await
            .map(|Query(q)| q)
            .unwrap_or_default();
        authorize(expected, query.token.as_deref())?;
        Ok(WebhookCaller)
    }
}
