//! Cache invalidation hook called by the content backend after an edit.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::cache::TAG_CONTENT;
use crate::error::ApiError;
use crate::state::AppState;

pub const REVALIDATE_HEADER: &str = "x-revalidate-secret";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/revalidate", post(revalidate))
}

#[derive(Debug, Deserialize)]
pub struct RevalidateQuery {
    /// Tag to invalidate; every content entry when omitted.
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub invalidated: usize,
    pub now: DateTime<Utc>,
}

/// POST /api/revalidate - Drop cached content
async fn revalidate(
    State(state): State<AppState>,
    Query(query): Query<RevalidateQuery>,
    headers: HeaderMap,
) -> Result<Json<RevalidateResponse>, ApiError> {
    let provided = headers
        .get(REVALIDATE_HEADER)
        .and_then(|value| value.to_str().ok());
    let expected = state.policy.revalidate_secret.as_str();

    let authorized = !expected.is_empty()
        && provided.is_some_and(|secret| bool::from(secret.as_bytes().ct_eq(expected.as_bytes())));

    if !authorized {
        tracing::warn!(
            header_present = provided.is_some(),
            "rejected revalidation request"
        );
        return Err(ApiError::Unauthorized);
    }

    let tag = query.tag.as_deref().unwrap_or(TAG_CONTENT);
    let invalidated =
        state.events.invalidate_tag(tag).await + state.event_pages.invalidate_tag(tag).await;
    tracing::info!(tag, invalidated, "content cache revalidated");

    Ok(Json(RevalidateResponse {
        revalidated: true,
        invalidated,
        now: Utc::now(),
    }))
}
