//! Calendar and event detail endpoints.
//!
//! Read paths degrade instead of failing: when the content backend is down or
//! sends records that break the event contract, the calendar is served empty
//! and the failure only shows up in the logs.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use retreat_calendar::{
    expand_event, expand_events, filter_occurrences, next_occurrence, CalendarRange, Event,
    Occurrence,
};
use serde::{Deserialize, Serialize};

use crate::cache::{TAG_CONTENT, TAG_EVENTS};
use crate::error::ApiError;
use crate::state::AppState;

const EVENTS_KEY: &str = "events";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/{slug}", get(event_detail))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub range: CalendarRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub range: CalendarRange,
    pub fetched_at: DateTime<Utc>,
    pub events: Vec<Occurrence>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailResponse {
    pub event: Event,
    pub occurrences: Vec<Occurrence>,
    pub next_occurrence: Option<Occurrence>,
}

/// GET /api/events?range=upcoming|past|all - Expanded calendar occurrences
async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let Query(query) = query?;
    let now = Utc::now();
    let (events, fetched_at) = load_events(&state).await;

    let occurrences = match expand_events(&events, &state.policy.expand) {
        Ok(expansion) => expansion.occurrences,
        Err(err) => {
            tracing::error!(error = %err, "event list breaks the event contract, serving empty calendar");
            Vec::new()
        }
    };
    let events = filter_occurrences(occurrences, query.range, now);
    tracing::debug!(range = %query.range, count = events.len(), "serving calendar");

    Ok(Json(CalendarResponse {
        range: query.range,
        fetched_at,
        events,
    }))
}

/// GET /api/events/:slug - One event with its display dates
async fn event_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EventDetailResponse>, ApiError> {
    let not_found = || ApiError::NotFound(format!("Event {:?}", slug));

    let event = load_event(&state, &slug).await.ok_or_else(not_found)?;
    let expansion = expand_event(&event, &state.policy.expand).map_err(|err| {
        tracing::error!(slug = %slug, error = %err, "event breaks the event contract");
        not_found()
    })?;

    let now = Utc::now();
    let next = next_occurrence(&expansion.occurrences, now).cloned();

    Ok(Json(EventDetailResponse {
        event,
        occurrences: expansion.occurrences,
        next_occurrence: next,
    }))
}

/// The event list from the cache, or fresh from the backend. Empty on failure.
async fn load_events(state: &AppState) -> (Arc<Vec<Event>>, DateTime<Utc>) {
    if let Some(hit) = state.events.get(EVENTS_KEY).await {
        return (hit.value, hit.fetched_at);
    }

    let fetched_at = Utc::now();
    match state.content.fetch_events().await {
        Ok(events) => {
            let events = Arc::new(events);
            state
                .events
                .insert(EVENTS_KEY, &[TAG_CONTENT, TAG_EVENTS], events.clone(), fetched_at)
                .await;
            (events, fetched_at)
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "content backend failed, serving empty calendar");
            (Arc::new(Vec::new()), fetched_at)
        }
    }
}

/// The event under `slug` from the cache, or fresh from the backend.
/// `None` when it does not exist or the backend failed; misses are not cached.
async fn load_event(state: &AppState, slug: &str) -> Option<Event> {
    let key = format!("event:{}", slug);
    if let Some(hit) = state.event_pages.get(&key).await {
        return Some(hit.value);
    }

    match state.content.fetch_event(slug).await {
        Ok(Some(event)) => {
            state
                .event_pages
                .insert(&key, &[TAG_CONTENT, TAG_EVENTS], event.clone(), Utc::now())
                .await;
            Some(event)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::error!(slug = %slug, error = %format!("{err:#}"), "content backend failed on event lookup");
            None
        }
    }
}
