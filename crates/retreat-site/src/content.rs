//! Content backend client.
//!
//! The backend exposes a GROQ-style query endpoint: `GET {api_url}?query=...`
//! with query parameters passed as `$name=<json>`, answering `{"result": ...}`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use retreat_calendar::event::decode_event;
use retreat_calendar::{decode_events, Event};
use serde::Deserialize;

use crate::config::ContentConfig;

/// Projection mapping backend documents onto the event record shape.
const EVENT_PROJECTION: &str = r#"{
  "id": _id,
  title,
  "slug": slug.current,
  start,
  end,
  allDay,
  location,
  description,
  recurrence
}"#;

/// Source of calendar events.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every published event.
    async fn fetch_events(&self) -> Result<Vec<Event>>;

    /// The event published under `slug`, if any.
    async fn fetch_event(&self, slug: &str) -> Result<Option<Event>>;
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: serde_json::Value,
}

/// [`ContentSource`] backed by the headless CMS query API.
pub struct SanityContentSource {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl SanityContentSource {
    pub fn new(config: &ContentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build content client")?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    async fn query(&self, query: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let mut request = self.client.get(&self.api_url).query(&[("query", query)]);
        for (name, value) in params {
            request = request.query(&[(format!("${}", name), value)]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Content backend unreachable")?;
        let status = response.status();
        if !status.is_success() {
            bail!("Content backend returned {}", status);
        }

        let body: QueryResponse = response
            .json()
            .await
            .context("Content backend returned a malformed payload")?;
        Ok(body.result)
    }
}

#[async_trait]
impl ContentSource for SanityContentSource {
    async fn fetch_events(&self) -> Result<Vec<Event>> {
        let query = format!(
            r#"*[_type == "event" && defined(start)] | order(start asc) {}"#,
            EVENT_PROJECTION
        );
        let result = self.query(&query, &[]).await?;

        let serde_json::Value::Array(records) = result else {
            bail!("Content backend returned a non-list event result");
        };
        let count = records.len();
        let events = decode_events(records)?;
        tracing::debug!(count, "fetched events");
        Ok(events)
    }

    async fn fetch_event(&self, slug: &str) -> Result<Option<Event>> {
        let query = format!(
            r#"*[_type == "event" && slug.current == $slug][0] {}"#,
            EVENT_PROJECTION
        );
        let slug_param = serde_json::to_string(slug)?;
        let result = self.query(&query, &[("slug", slug_param)]).await?;

        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(decode_event(0, result)?))
    }
}
