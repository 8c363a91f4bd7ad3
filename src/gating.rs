//! Bot-gating: CAPTCHA tokens on the widget side, score verification on the
//! server side.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::errors::AppError;

/// The action every submission token is scoped to.
pub const SUBMIT_ACTION: &str = "submit";

/// Shown when the gating provider has not finished initializing.
pub const NOT_READY_MESSAGE: &str =
    "Security check is not ready yet. Please wait a moment and try again.";

/// A single-use proof-of-interaction token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatingToken(String);

impl GatingToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Widget-side CAPTCHA provider.
///
/// Implementations wrap whatever script or service issues tokens. A provider
/// that is not ready must answer `AppError::GatingUnavailable` rather than
/// block.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Whether the provider has finished initializing.
    fn is_ready(&self) -> bool;

    /// Obtains a fresh token scoped to `action`.
    async fn obtain_token(&self, action: &str) -> Result<GatingToken, AppError>;
}

/// Response of the CAPTCHA scoring service's verify endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Applies the trust policy to a verify response.
///
/// Rejects when the service reports failure, when the reported action does not
/// match, and when the score is at or below `min_score`. A missing score counts
/// as zero.
pub fn evaluate_verdict(
    verdict: &SiteVerifyResponse,
    expected_action: &str,
    min_score: f64,
) -> Result<f64, AppError> {
    if !verdict.success {
        return Err(AppError::GatingRejected(format!(
            "CAPTCHA validation failed ({})",
            if verdict.error_codes.is_empty() {
                "no reason given".to_string()
            } else {
                verdict.error_codes.join(", ")
            }
        )));
    }

    if let Some(action) = verdict.action.as_deref() {
        if action != expected_action {
            return Err(AppError::GatingRejected(format!(
                "CAPTCHA action mismatch: expected '{}', got '{}'",
                expected_action, action
            )));
        }
    }

    let score = verdict.score.unwrap_or(0.0);
    if score <= min_score {
        return Err(AppError::GatingRejected(format!(
            "CAPTCHA score {:.2} is below the required threshold",
            score
        )));
    }

    Ok(score)
}

/// Server-side verifier for submission tokens.
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: Client,
    verify_url: String,
    secret: String,
    min_score: f64,
}

impl RecaptchaVerifier {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            verify_url: config.recaptcha_verify_url.clone(),
            secret: config.recaptcha_secret.clone(),
            min_score: config.recaptcha_min_score,
        }
    }

    /// Verifies `token` with the scoring service and returns the accepted score.
    pub async fn verify(&self, token: &str, expected_action: &str) -> Result<f64, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::GatingRejected(
                "Missing CAPTCHA token".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("CAPTCHA verify failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::TransportError(format!(
                "CAPTCHA service returned {}",
                status
            )));
        }

        let verdict: SiteVerifyResponse = response.json().await.map_err(|e| {
            AppError::TransportError(format!("Failed to parse CAPTCHA response: {}", e))
        })?;

        match evaluate_verdict(&verdict, expected_action, self.min_score) {
            Ok(score) => {
                tracing::debug!("✓ CAPTCHA accepted (score {:.2})", score);
                Ok(score)
            }
            Err(e) => {
                tracing::warn!("❌ {}", e);
                Err(e)
            }
        }
    }
}
