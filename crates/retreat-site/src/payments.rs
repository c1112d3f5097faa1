//! Payment processor client for donation intents.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::PaymentsConfig;

/// A donation waiting to be confirmed client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationIntent {
    /// Smallest currency unit, e.g. cents.
    pub amount: u64,
    pub currency: String,
    pub email: String,
    pub name: String,
}

/// Creates payment intents and hands back the client-side confirmation secret.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_donation_intent(&self, intent: &DonationIntent) -> Result<String>;
}

#[derive(Deserialize)]
struct PaymentIntentResponse {
    client_secret: String,
}

#[derive(Deserialize)]
struct ProcessorErrorBody {
    error: ProcessorError,
}

#[derive(Deserialize)]
struct ProcessorError {
    #[serde(default)]
    message: Option<String>,
}

/// [`PaymentProcessor`] backed by the Stripe payment-intents API.
pub struct StripePayments {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl StripePayments {
    pub fn new(config: &PaymentsConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build payments client")?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripePayments {
    async fn create_donation_intent(&self, intent: &DonationIntent) -> Result<String> {
        let form = [
            ("amount", intent.amount.to_string()),
            ("currency", intent.currency.clone()),
            ("receipt_email", intent.email.clone()),
            ("description", "Donation".to_string()),
            ("metadata[donor_name]", intent.name.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("Payment processor unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ProcessorErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            bail!("Payment processor rejected the intent: {}", message);
        }

        let body: PaymentIntentResponse = response
            .json()
            .await
            .context("Payment processor returned a malformed payload")?;
        Ok(body.client_secret)
    }
}
