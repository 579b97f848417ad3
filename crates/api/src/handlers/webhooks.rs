//! Handlers for the job-board webhooks.
//!
//! The job board calls `POST /webhooks/job-posts` once a post is published
//! and polls `GET /webhooks/active-countries` to decide which posts are
//! worth announcing at all. Both require the shared webhook token.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use jobroute_core::entity::CountryCode;
use jobroute_core::error::CoreError;
use jobroute_core::types::DbId;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::webhook_token::{authorize, header_token, WebhookCaller};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a "job post published" webhook.
///
/// The post itself is re-read from the directory; `country_code` is only
/// used when the directory has none and `title` only for logging.
#[derive(Debug, Deserialize, Validate)]
pub struct JobPostWebhook {
    #[validate(range(min = 1, message = "post_id must be a positive integer"))]
    pub post_id: DbId,
    #[validate(length(equal = 2, message = "country_code must be two letters"))]
    pub country_code: Option<String>,
    #[validate(length(max = 255, message = "title must be at most 255 characters"))]
    pub title: Option<String>,
    /// Alternative to the `X-Webhook-Token` header.
    #[serde(default)]
    pub token: Option<String>,
}

impl JobPostWebhook {
    /// Validate the payload and return the normalised country hint.
    pub fn country_hint(&self) -> Result<Option<CountryCode>, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(format!("Invalid webhook payload: {e}")))?;
        self.country_code
            .as_deref()
            .map(CountryCode::parse)
            .transpose()
    }
}

/// POST /api/v1/webhooks/job-posts
///
/// Authenticates before the payload is interpreted, then routes the post to
/// every operator sharing job posts in its country. Partial failures still
/// answer 200 with `success: false` and per-recipient counters.
pub async fn job_post_published(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    // A body that is not JSON can still carry nothing but a header token.
    let raw: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let presented = header_token(&headers).or_else(|| raw.get("token").and_then(Value::as_str));
    authorize(&state.config.webhook_token, presented)?;

    let payload: JobPostWebhook = serde_json::from_value(raw)
        .map_err(|e| CoreError::Validation(format!("Invalid webhook payload: {e}")))?;
    let country_hint = payload.country_hint()?;

    tracing::info!(
        post_id = payload.post_id,
        country_code = ?country_hint,
        title = payload.title.as_deref().unwrap_or(""),
        "Job post webhook received",
    );

    let outcome = state
        .pipeline
        .handle_job_post_webhook(payload.post_id, country_hint)
        .await?;

    if outcome.success {
        tracing::info!(post_id = payload.post_id, message = %outcome.message, "Job post webhook processed");
    } else {
        tracing::warn!(post_id = payload.post_id, message = %outcome.message, "Job post webhook processed with problems");
    }

    Ok(Json(outcome))
}

/// GET /api/v1/webhooks/active-countries
///
/// Countries covered by at least one operator who would accept some entity.
pub async fn active_countries(
    _caller: WebhookCaller,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let countries = state.pipeline.active_countries().await?;

    Ok(Json(DataResponse { data: countries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn payload(json: &str) -> JobPostWebhook {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn country_hint_is_normalised() {
        let p = payload(r#"{"post_id": 7, "country_code": "mw"}"#);
        assert_eq!(p.country_hint().unwrap().unwrap().as_str(), "MW");
    }

    #[test]
    fn country_is_optional() {
        let p = payload(r#"{"post_id": 7}"#);
        assert_eq!(p.country_hint().unwrap(), None);
    }

    #[test]
    fn zero_post_id_is_rejected() {
        let p = payload(r#"{"post_id": 0}"#);
        assert_matches!(p.country_hint(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn bad_country_codes_are_rejected() {
        for code in ["MWI", "M", "1W"] {
            let p = payload(&format!(r#"{{"post_id": 7, "country_code": "{code}"}}"#));
            assert_matches!(p.country_hint(), Err(CoreError::Validation(_)), "{code}");
        }
    }

    #[test]
    fn overlong_title_is_rejected() {
        let p = JobPostWebhook {
            post_id: 7,
            country_code: None,
            title: Some("x".repeat(256)),
            token: None,
        };
        assert_matches!(p.country_hint(), Err(CoreError::Validation(_)));
    }
}
