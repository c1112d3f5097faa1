//! Human-verification challenge gating the write paths.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::VerificationConfig;
use crate::error::ApiError;

/// Outcome of a verification check.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Verdict {
    pub success: bool,
    /// Confidence that the submitter is human, 0.0 to 1.0, when the service scores.
    #[serde(default)]
    pub score: Option<f64>,
}

impl Verdict {
    /// Passes when the check succeeded and any score meets `min_score`.
    pub fn passes(&self, min_score: f64) -> bool {
        self.success && self.score.is_none_or(|score| score >= min_score)
    }
}

#[async_trait]
pub trait HumanVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Verdict>;
}

/// [`HumanVerifier`] backed by a reCAPTCHA-style `siteverify` endpoint.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl RecaptchaVerifier {
    pub fn new(config: &VerificationConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build verification client")?;
        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            secret: config.secret.clone(),
        })
    }
}

#[async_trait]
impl HumanVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<Verdict> {
        let verdict = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .context("Verification service unreachable")?
            .error_for_status()
            .context("Verification service rejected the request")?
            .json::<Verdict>()
            .await
            .context("Verification service returned a malformed payload")?;
        Ok(verdict)
    }
}

/// Reject the submission unless `token` passes verification.
///
/// A verification service failure rejects the submission too.
pub async fn ensure_human(
    verifier: &dyn HumanVerifier,
    token: &str,
    min_score: f64,
) -> Result<(), ApiError> {
    if token.trim().is_empty() {
        return Err(ApiError::VerificationFailed(
            "Missing verification token.".to_string(),
        ));
    }

    match verifier.verify(token).await {
        Ok(verdict) if verdict.passes(min_score) => Ok(()),
        Ok(verdict) => {
            tracing::warn!(
                success = verdict.success,
                score = ?verdict.score,
                min_score,
                "submission failed human verification"
            );
            Err(ApiError::VerificationFailed(
                "We could not verify that you are human. Please try again.".to_string(),
            ))
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "human verification unavailable");
            Err(ApiError::VerificationFailed(
                "Verification is unavailable right now. Please try again later.".to_string(),
            ))
        }
    }
}
