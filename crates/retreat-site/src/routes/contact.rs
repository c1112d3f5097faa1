//! Contact form endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::mail::OutgoingMail;
use crate::routes::looks_like_email;
use crate::state::AppState;
use crate::verification::ensure_human;

const MAX_MESSAGE_CHARS: usize = 5000;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/contact", post(submit_contact))
}

/// Request body for a contact-form submission
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    /// Human-verification token.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

/// POST /api/contact - Forward a message to the house
async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>, ApiError> {
    let Json(req) = payload?;
    validate(&req)?;
    ensure_human(state.verifier.as_ref(), &req.token, state.policy.min_score).await?;

    let mail = compose(&req, &state.policy.operator_address);
    state.mail.send(&mail).await.map_err(|err| {
        tracing::error!(error = %format!("{err:#}"), "contact mail failed");
        ApiError::Upstream(
            "Your message could not be sent. Please try again later.".to_string(),
        )
    })?;

    tracing::info!("contact message delivered");
    Ok(Json(ContactResponse { success: true }))
}

fn validate(req: &ContactRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Please enter your name.".to_string()));
    }
    if !looks_like_email(&req.email) {
        return Err(ApiError::BadRequest(
            "Please enter a valid email address.".to_string(),
        ));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Please enter a message.".to_string()));
    }
    if req.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Messages are limited to {} characters.",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}

/// Build the operator notification for a submission.
pub fn compose(req: &ContactRequest, operator_address: &str) -> OutgoingMail {
    let name = req.name.trim();
    let topic = req
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("New message");

    let mut text = format!("Name: {}\nEmail: {}\n", name, req.email.trim());
    if let Some(phone) = req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        text.push_str(&format!("Phone: {}\n", phone));
    }
    text.push_str(&format!("Subject: {}\n\n{}\n", topic, req.message.trim()));

    OutgoingMail {
        to: operator_address.to_string(),
        reply_to: Some(req.email.trim().to_string()),
        subject: format!("Website contact: {} ({})", topic, name),
        text,
    }
}
