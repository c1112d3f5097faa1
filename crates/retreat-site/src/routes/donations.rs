//! Donation intent endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::payments::DonationIntent;
use crate::routes::looks_like_email;
use crate::state::{AppState, SitePolicy};
use crate::verification::ensure_human;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/donations", post(create_donation))
}

/// Request body for a donation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    /// Smallest currency unit.
    pub amount: u64,
    pub email: String,
    pub name: String,
    /// Human-verification token.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponse {
    pub client_secret: String,
}

/// POST /api/donations - Start a donation and return the confirmation secret
async fn create_donation(
    State(state): State<AppState>,
    payload: Result<Json<DonationRequest>, JsonRejection>,
) -> Result<Json<DonationResponse>, ApiError> {
    let Json(req) = payload?;
    validate(&req, &state.policy)?;
    ensure_human(state.verifier.as_ref(), &req.token, state.policy.min_score).await?;

    let intent = DonationIntent {
        amount: req.amount,
        currency: state.policy.currency.clone(),
        email: req.email.trim().to_string(),
        name: req.name.trim().to_string(),
    };

    let client_secret = state
        .payments
        .create_donation_intent(&intent)
        .await
        .map_err(|err| {
            tracing::error!(amount = intent.amount, error = %format!("{err:#}"), "donation intent failed");
            ApiError::Upstream(
                "We couldn't start your donation. Please try again later.".to_string(),
            )
        })?;

    tracing::info!(amount = intent.amount, currency = %intent.currency, "donation intent created");
    Ok(Json(DonationResponse { client_secret }))
}

fn validate(req: &DonationRequest, policy: &SitePolicy) -> Result<(), ApiError> {
    if req.amount < policy.min_amount || req.amount > policy.max_amount {
        return Err(ApiError::BadRequest(format!(
            "Donations must be between {} and {}.",
            format_amount(policy.min_amount, &policy.currency),
            format_amount(policy.max_amount, &policy.currency)
        )));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Please enter your name.".to_string()));
    }
    if !looks_like_email(&req.email) {
        return Err(ApiError::BadRequest(
            "Please enter a valid email address.".to_string(),
        ));
    }
    Ok(())
}

/// `1234, "usd"` → `"12.34 USD"`.
fn format_amount(amount: u64, currency: &str) -> String {
    format!(
        "{}.{:02} {}",
        amount / 100,
        amount % 100,
        currency.to_ascii_uppercase()
    )
}
